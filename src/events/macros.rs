/// Emit an `ExtensionEvent` without spelling out the metadata boilerplate.
#[macro_export]
macro_rules! emit_extension_event {
    ($level:expr, $action:expr, $name:expr, $owner:expr, $detail:expr) => {{
        let meta = $crate::events::dispatcher::meta("extensions", $level);
        $crate::events::dispatcher::emit($crate::events::model::LogEvent::Extension(
            $crate::events::model::ExtensionEvent {
                meta,
                action: $action.to_string(),
                extension: $name.to_string(),
                owner: $owner,
                detail: $detail,
            },
        ));
    }};
}

/// Emit a `ConfigEvent`; `errors` is any iterator of displayable items.
#[macro_export]
macro_rules! emit_config_event {
    ($level:expr, $action:expr, $source:expr, $errors:expr, $detail:expr) => {{
        let mut meta = $crate::events::dispatcher::meta("config", $level);
        meta.corr_id = Some($crate::events::dispatcher::correlation_id());
        $crate::events::dispatcher::emit($crate::events::model::LogEvent::Config(
            $crate::events::model::ConfigEvent {
                meta,
                action: $action.to_string(),
                source: $source,
                errors: $errors.into_iter().map(|e| e.to_string()).collect(),
                detail: $detail,
            },
        ));
    }};
}
