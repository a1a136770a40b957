/// When `dry_run` is set, `PolicyEngine::check`/`check_sync` still run every
/// gate and populate `denied_by`/`reason`, but force the observable
/// `allowed` flag to `true` so callers can see what *would* happen without
/// blocking the action.
#[derive(Clone, Debug, Default)]
pub struct PolicyEngineConfig {
    pub dry_run: bool,
}
