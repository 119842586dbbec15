use serde::Deserialize;

#[derive(Deserialize, Default)]
/// Request payload for the archive endpoint.
/// With `dry_run` set the job reports the selection without archiving anything.
pub struct StartArchiveRequest {
    #[serde(default)]
    pub dry_run: bool,
}
