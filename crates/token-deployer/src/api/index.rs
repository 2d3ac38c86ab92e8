use {std::path::Path, tower_http::services::ServeFile};

/// Serves the frontend page. Responds with 404 while `index.html` is missing
/// from the static directory.
pub fn index_service(static_dir: &Path) -> ServeFile {
    ServeFile::new(static_dir.join("index.html"))
}
