use std::fmt;

use tern_model::ResourceUri;
use uuid::Uuid;

/// A path inside a [`super::SharedStorage`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location(ResourceUri);

impl Location {
    pub fn new(uri: ResourceUri) -> Self {
        Self(uri)
    }

    #[inline]
    pub fn uri(&self) -> &ResourceUri {
        &self.0
    }

    pub fn into_uri(self) -> ResourceUri {
        self.0
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Child location.
    pub fn append(&self, segment: &str) -> Location {
        Location(self.0.join(segment))
    }

    /// Child location with a unique name that keeps the extension of `name`.
    ///
    /// `cfg.yaml` becomes `cfg.<unique>.yaml`; names without an extension get
    /// the unique part appended.
    pub fn temp_file(&self, name: &str) -> Location {
        let unique = Uuid::new_v4().simple().to_string();
        let unique = &unique[..16];
        let file = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                format!("{stem}.{unique}.{ext}")
            }
            _ => format!("{name}.{unique}"),
        };
        self.append(&file)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Location {
        Location::new(ResourceUri::from_parts("mem", "", "/app/r1"))
    }

    #[test]
    fn temp_file_keeps_extension() {
        let loc = root().temp_file("cfg.yaml");
        let name = loc.uri().file_name().unwrap();
        assert!(name.starts_with("cfg."), "{name}");
        assert!(name.ends_with(".yaml"), "{name}");
        assert_ne!(name, "cfg.yaml");
        assert!(loc.path().starts_with("/app/r1/"));
    }

    #[test]
    fn temp_file_without_extension() {
        for name in ["Makefile", ".profile"] {
            let loc = root().temp_file(name);
            let file = loc.uri().file_name().unwrap();
            assert!(file.starts_with(&format!("{name}.")), "{file}");
        }
    }

    #[test]
    fn temp_files_are_unique() {
        assert_ne!(root().temp_file("a.tar"), root().temp_file("a.tar"));
    }
}
