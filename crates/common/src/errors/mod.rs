//! Commonly used error helpers.

mod private {
    use eyre::Chain;
    use std::error::Error;

    pub trait ErrorChain {
        fn chain(&self) -> Chain<'_>;
    }

    impl ErrorChain for dyn Error + 'static {
        fn chain(&self) -> Chain<'_> {
            Chain::new(self)
        }
    }

    impl ErrorChain for eyre::Report {
        fn chain(&self) -> Chain<'_> {
            self.chain()
        }
    }
}

/// Marker wallets and chain nodes put in front of their messages, possibly repeated.
const ERROR_MARKER: &str = "Error:";

/// Displays a chain of errors in a single line.
pub fn display_chain<E: private::ErrorChain + ?Sized>(error: &E) -> String {
    dedup_chain(error).join("; ")
}

/// Deduplicates a chain of errors.
pub fn dedup_chain<E: private::ErrorChain + ?Sized>(error: &E) -> Vec<String> {
    let mut causes = all_sources(error);
    // Deduplicate the common pattern `msg1: msg2; msg2` -> `msg1: msg2`.
    causes.dedup_by(|b, a| a.contains(b.as_str()));
    causes
}

fn all_sources<E: private::ErrorChain + ?Sized>(err: &E) -> Vec<String> {
    err.chain().map(|cause| cause.to_string().trim().to_string()).collect()
}

/// Normalizes a message for display: removes every `Error:` marker and collapses the whitespace
/// left behind.
pub fn clean_message(message: &str) -> String {
    message.replace(ERROR_MARKER, "").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-line, marker-free rendering of an error and its sources.
pub fn user_message(error: &(dyn std::error::Error + 'static)) -> String {
    clean_message(&display_chain(error))
}
