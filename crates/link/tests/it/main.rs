mod authorize;
mod chains;
mod connection;
mod create_link;
mod link_status;
mod listener;
mod supersede;
mod utils;
