use std::fs;
use std::path::Path;

fn path_components(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split('/')
        .filter(|component| !component.is_empty())
        .map(|component| component.replace("[0]", ""))
}

/// Short column label for an element path: the last two components joined by
/// `.`, with zero indices stripped.
pub fn path_to_column_name(path: &str) -> String {
    let components: Vec<String> = path_components(path).collect();
    let start = components.len().saturating_sub(2);
    components[start..].join(".")
}

/// Element path made relative to the working directory, e.g.
/// `/model/soma[0]/Vm` becomes `model/soma/Vm`.
pub fn path_to_user_path(path: &str) -> String {
    path_components(path).collect::<Vec<_>>().join("/")
}

/// Makes sure the file at `path` can be created. Parent directories are
/// created on demand; if that fails the path collapses into a flat file name
/// in the working directory.
pub fn prepare_datafile(path: &str) -> String {
    let parent = match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return path.to_owned(),
    };

    match fs::create_dir_all(parent) {
        Ok(()) => path.to_owned(),
        Err(err) => {
            let flat = path.trim_start_matches('/').replace('/', "_");
            log::warn!(
                "cannot create directory {} ({}), writing to {} instead",
                parent.display(),
                err,
                flat
            );
            flat
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_name() {
        assert_eq!(path_to_column_name("/model/soma[0]/Vm"), "soma.Vm");
        assert_eq!(path_to_column_name("/data/vm"), "data.vm");
        assert_eq!(path_to_column_name("/vm"), "vm");
        assert_eq!(path_to_column_name("/a/b/c[2]/d"), "c[2].d");
        assert_eq!(path_to_column_name(""), "");
    }

    #[test]
    fn user_path() {
        assert_eq!(path_to_user_path("/model/soma[0]/Vm"), "model/soma/Vm");
        assert_eq!(path_to_user_path("/vm"), "vm");
        assert_eq!(path_to_user_path("rel//x/"), "rel/x");
    }

    #[test]
    fn datafile_parent_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("vm.csv");
        let path = path.to_str().unwrap();

        assert_eq!(prepare_datafile(path), path);
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn datafile_without_parent() {
        assert_eq!(prepare_datafile("vm.csv"), "vm.csv");
    }

    #[test]
    fn datafile_collapses_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("vm.csv");

        let prepared = prepare_datafile(path.to_str().unwrap());
        assert!(!prepared.contains('/'));
        assert!(prepared.ends_with("blocker_vm.csv"));
    }
}
