use cadence_client::BoxFuture;

/// Asks the user to approve an irreversible action.
///
/// Promotion and deletions consult this before any network call; a `false`
/// answer cancels the action.
pub trait Confirm: Send + Sync {
    fn confirm<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, bool>;
}
