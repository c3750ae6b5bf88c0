/// Suggested file name offered when sharing an export
pub const EXPORT_FILE_NAME: &str = "exported.ply";

/// Content type advertised for exported point clouds
pub const EXPORT_CONTENT_TYPE: &str = "application/octet-stream";

/// Settings file looked up next to a recorded capture
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Frame index written by the capture recorder
pub const CAPTURE_MANIFEST_FILE_NAME: &str = "capture.json";
