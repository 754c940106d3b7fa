/// Runs background jobs.
///
/// @component
/// - group: Jobs
pub struct JobQueue;
