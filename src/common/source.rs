use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

/// `Source` represents some literal dialogue source:
/// a document on disk, a test snippet, or text handed over by a host.
/// It's essentially a string with a path, the path serving as the
/// source's name in diagnostics. Sources without a path point to
/// `./source`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Creates a new `Source` given both an `&str` and a path.
    /// Note that this function does not check that the contents
    /// match the file at `path`;
    /// `Source::path` or `Source::source` should usually be used instead.
    pub fn new(source: &str, path: &Path) -> Rc<Source> {
        Rc::new(Source {
            contents: source.to_string(),
            path: path.to_owned(),
        })
    }

    /// Build a `Source` by reading the file at `path`.
    pub fn path(path: &Path) -> std::io::Result<Rc<Source>> {
        let contents = fs::read_to_string(path)?;
        Ok(Source::new(&contents, path))
    }

    /// Build a `Source` containing just a string.
    /// Note that this source will point towards `./source`.
    pub fn source(source: &str) -> Rc<Source> {
        Source::new(source, &PathBuf::from("./source"))
    }
}
