/// Relocation of a single file into its destination folder.
///
/// The mover creates the destination folder (and any missing ancestors) on
/// demand, refuses destinations that would escape the sorted folder, and
/// applies an explicit [`ConflictPolicy`] when the target name is taken.
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// What to do when a file with the same name already sits in the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConflictPolicy {
    /// Leave the source in place and report the file as failed.
    #[default]
    Skip,
    /// Move under the first free `name (N).ext` in the destination.
    Rename,
}

/// Errors that can occur while moving one file.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Failed to create the destination folder.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to move the file.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The destination already holds a file of the same name.
    #[error("Destination already exists: {}", .0.display())]
    DestinationOccupied(PathBuf),
    /// The folder name would place the file outside the sorted folder.
    #[error("Refusing to move into '{name}': destination leaves the sorted folder")]
    UnsafeDestination { name: String },
    /// The source path has no file name component.
    #[error("File has no name component: {}", .0.display())]
    MissingFileName(PathBuf),
}

/// A completed relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    /// Where the file was before the move.
    pub from: PathBuf,
    /// Where the file is now.
    pub to: PathBuf,
}

/// Resolve `folder_name` under `base`, rejecting names that leave `base`.
///
/// Nested relative names such as `Work/2024` are allowed.
pub fn resolve_destination(base: &Path, folder_name: &str) -> Result<PathBuf, MoveError> {
    let relative = Path::new(folder_name);
    let mut has_normal = false;

    for component in relative.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(MoveError::UnsafeDestination {
                    name: folder_name.to_string(),
                });
            }
        }
    }

    if !has_normal {
        return Err(MoveError::UnsafeDestination {
            name: folder_name.to_string(),
        });
    }

    Ok(base.join(relative))
}

/// Moves files into destination folders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mover {
    policy: ConflictPolicy,
}

/// Attempts at finding a free name before a Rename move gives up.
const MAX_RENAME_ATTEMPTS: usize = 16;

impl Mover {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Work out where `file` would land in `destination_dir` under this mover's policy.
    ///
    /// Touches nothing. A dry run uses this directly; [`Mover::move_file`] uses it
    /// before every attempt, so both report the same target.
    ///
    /// # Arguments
    ///
    /// * `file` - The file that would be moved
    /// * `destination_dir` - The folder it would be moved into; it need not exist yet
    ///
    /// # Errors
    ///
    /// `MissingFileName` if `file` has no name component, `DestinationOccupied`
    /// if the name is taken and the policy is [`ConflictPolicy::Skip`].
    pub fn plan_target(&self, file: &Path, destination_dir: &Path) -> Result<PathBuf, MoveError> {
        let file_name = file
            .file_name()
            .ok_or_else(|| MoveError::MissingFileName(file.to_path_buf()))?;

        let target = destination_dir.join(file_name);
        if target.symlink_metadata().is_err() {
            return Ok(target);
        }

        match self.policy {
            ConflictPolicy::Skip => Err(MoveError::DestinationOccupied(target)),
            ConflictPolicy::Rename => Ok(next_free_name(&target)),
        }
    }

    /// Move `file` into `destination_dir`, keeping its base name.
    ///
    /// The destination folder is created if missing; an existing folder is reused.
    /// An existing file at the target is never replaced, even if it appears
    /// between planning and moving.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use downsort::mover::{ConflictPolicy, Mover};
    /// use std::path::Path;
    ///
    /// let mover = Mover::new(ConflictPolicy::Skip);
    /// match mover.move_file(Path::new("/tmp/in/photo.jpg"), Path::new("/tmp/in/Images")) {
    ///     Ok(moved) => println!("Moved to {}", moved.to.display()),
    ///     Err(e) => eprintln!("{}", e),
    /// }
    /// ```
    pub fn move_file(&self, file: &Path, destination_dir: &Path) -> Result<MovedFile, MoveError> {
        if file.file_name().is_none() {
            return Err(MoveError::MissingFileName(file.to_path_buf()));
        }

        fs::create_dir_all(destination_dir).map_err(|source| {
            MoveError::DirectoryCreationFailed {
                path: destination_dir.to_path_buf(),
                source,
            }
        })?;

        let mut attempts = 0;
        loop {
            let target = self.plan_target(file, destination_dir)?;
            match relocate(file, &target) {
                Ok(()) => {
                    tracing::info!(from = %file.display(), to = %target.display(), "Moved file");
                    return Ok(MovedFile {
                        from: file.to_path_buf(),
                        to: target,
                    });
                }
                // Lost a race for the name; Rename plans again, Skip reports it.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if self.policy == ConflictPolicy::Skip || attempts >= MAX_RENAME_ATTEMPTS {
                        return Err(MoveError::DestinationOccupied(target));
                    }
                }
                Err(source) => {
                    return Err(MoveError::MoveFailed {
                        from: file.to_path_buf(),
                        to: target,
                        source,
                    });
                }
            }
        }
    }
}

/// Move `from` to `to` without ever replacing an existing `to`.
///
/// Hard-links then unlinks the source; where hard links are unavailable
/// (other device, unsupported filesystem) falls back to copy-then-remove.
/// Fails with `AlreadyExists` if `to` is taken.
fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => finish_move(from, to),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) if from.symlink_metadata().is_err() => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "Hard link unavailable, copying instead");
            copy_no_clobber(from, to)?;
            finish_move(from, to)
        }
    }
}

/// Remove the source once `to` holds the file. If that fails, remove `to`
/// again so the file is not left in two places.
fn finish_move(from: &Path, to: &Path) -> io::Result<()> {
    match fs::remove_file(from) {
        Ok(()) => Ok(()),
        // Someone else took the source away; `to` is now the only copy.
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %from.display(), "Source vanished after it was linked");
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(to) {
                tracing::warn!(
                    path = %to.display(),
                    error = %cleanup,
                    "Could not remove copy after failed move"
                );
            }
            Err(e)
        }
    }
}

/// Copy `from` to a new file at `to`, failing if `to` exists.
///
/// A symlink is recreated as a symlink rather than copied through.
fn copy_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(unix)]
    if from.symlink_metadata()?.file_type().is_symlink() {
        return std::os::unix::fs::symlink(fs::read_link(from)?, to);
    }

    let mut source = fs::File::open(from)?;
    let mut dest = fs::OpenOptions::new().write(true).create_new(true).open(to)?;
    let copied = io::copy(&mut source, &mut dest)
        .and_then(|_| dest.sync_all())
        .and_then(|_| fs::set_permissions(to, source.metadata()?.permissions()));

    if copied.is_err() {
        let _ = fs::remove_file(to);
    }
    copied
}

/// First `stem (N).ext` next to `taken` that does not exist yet.
fn next_free_name(taken: &Path) -> PathBuf {
    let parent = taken.parent().unwrap_or_else(|| Path::new(""));
    let name = taken
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let entry = crate::classifier::FileEntry::from_name(&name);

    (1u32..)
        .map(|n| parent.join(format!("{} ({}){}", entry.stem, n, entry.extension)))
        .find(|candidate| candidate.symlink_metadata().is_err())
        .unwrap_or_else(|| taken.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_move_file_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let moved = Mover::default()
            .move_file(&file_path, &base_path.join("Documents"))
            .expect("Failed to move file");

        let category_dir = base_path.join("Documents");
        assert!(category_dir.is_dir());
        assert!(!file_path.exists());
        assert_eq!(moved.to, category_dir.join("test.txt"));
        assert_eq!(fs::read_to_string(&moved.to).unwrap(), "test content");
    }

    #[test]
    fn test_move_file_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let category_dir = base_path.join("Images");
        fs::create_dir(&category_dir).expect("Failed to create category directory");
        let file_path = base_path.join("test.png");
        fs::write(&file_path, "png").expect("Failed to write test file");

        Mover::default()
            .move_file(&file_path, &category_dir)
            .expect("Failed to move file");

        assert!(!file_path.exists());
        assert!(category_dir.join("test.png").exists());
    }

    #[test]
    fn test_move_file_creates_missing_ancestors() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("plan.pdf");
        fs::write(&file_path, "x").unwrap();

        let destination = temp_dir.path().join("Work").join("2024");
        Mover::default().move_file(&file_path, &destination).unwrap();

        assert!(destination.join("plan.pdf").exists());
    }

    #[test]
    fn test_skip_policy_keeps_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("Other");
        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("notes.txt"), "old").unwrap();
        let file_path = temp_dir.path().join("notes.txt");
        fs::write(&file_path, "new").unwrap();

        let result = Mover::new(ConflictPolicy::Skip).move_file(&file_path, &destination);

        assert!(matches!(result, Err(MoveError::DestinationOccupied(_))));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new");
        assert_eq!(fs::read_to_string(destination.join("notes.txt")).unwrap(), "old");
    }

    #[test]
    fn test_rename_policy_picks_free_name() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("Other");
        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("notes.txt"), "old").unwrap();
        fs::write(destination.join("notes (1).txt"), "older").unwrap();
        let file_path = temp_dir.path().join("notes.txt");
        fs::write(&file_path, "new").unwrap();

        let moved = Mover::new(ConflictPolicy::Rename)
            .move_file(&file_path, &destination)
            .unwrap();

        assert_eq!(moved.to, destination.join("notes (2).txt"));
        assert_eq!(fs::read_to_string(&moved.to).unwrap(), "new");
        assert_eq!(fs::read_to_string(destination.join("notes.txt")).unwrap(), "old");
    }

    #[test]
    fn test_destination_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("Other");
        fs::write(&blocker, "i am a file").unwrap();
        let file_path = temp_dir.path().join("notes.txt");
        fs::write(&file_path, "x").unwrap();

        let result = Mover::default().move_file(&file_path, &blocker);

        assert!(matches!(result, Err(MoveError::DirectoryCreationFailed { .. })));
        assert!(file_path.exists());
    }

    #[test]
    fn test_missing_source_reports_move_failure() {
        let temp_dir = TempDir::new().unwrap();
        let result = Mover::default().move_file(
            &temp_dir.path().join("vanished.txt"),
            &temp_dir.path().join("Other"),
        );

        assert!(matches!(result, Err(MoveError::MoveFailed { .. })));
    }

    #[test]
    fn test_resolve_destination() {
        let base = Path::new("/downloads");
        assert_eq!(
            resolve_destination(base, "Images").unwrap(),
            PathBuf::from("/downloads/Images")
        );
        assert_eq!(
            resolve_destination(base, "Work/2024").unwrap(),
            PathBuf::from("/downloads/Work/2024")
        );
    }

    #[test]
    fn test_resolve_destination_rejects_escapes() {
        let base = Path::new("/downloads");
        for name in ["..", "../elsewhere", "/etc", "a/../../b", "", "."] {
            assert!(
                matches!(
                    resolve_destination(base, name),
                    Err(MoveError::UnsafeDestination { .. })
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_next_free_name_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        let taken = temp_dir.path().join("README");
        fs::write(&taken, "x").unwrap();

        assert_eq!(next_free_name(&taken), temp_dir.path().join("README (1)"));
    }

    #[test]
    fn test_plan_target_follows_policy() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("Images");
        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("photo.jpg"), "old").unwrap();
        let file_path = temp_dir.path().join("photo.jpg");

        let skip = Mover::new(ConflictPolicy::Skip).plan_target(&file_path, &destination);
        assert!(matches!(skip, Err(MoveError::DestinationOccupied(_))));

        let rename = Mover::new(ConflictPolicy::Rename)
            .plan_target(&file_path, &destination)
            .unwrap();
        assert_eq!(rename, destination.join("photo (1).jpg"));

        // A missing destination folder is fine and is not created.
        let fresh = Mover::default()
            .plan_target(&file_path, &temp_dir.path().join("Fresh"))
            .unwrap();
        assert_eq!(fresh, temp_dir.path().join("Fresh").join("photo.jpg"));
        assert!(!temp_dir.path().join("Fresh").exists());
    }

    #[test]
    fn test_relocate_never_replaces_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("new.txt");
        let to = temp_dir.path().join("taken.txt");
        fs::write(&from, "new").unwrap();
        fs::write(&to, "old").unwrap();

        let err = relocate(&from, &to).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&from).unwrap(), "new");
        assert_eq!(fs::read_to_string(&to).unwrap(), "old");
    }

    #[test]
    fn test_finish_move_removes_copy_when_source_stays() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be removed with remove_file, whatever the permissions.
        let from = temp_dir.path().join("stuck");
        fs::create_dir(&from).unwrap();
        let to = temp_dir.path().join("copy.txt");
        fs::write(&to, "copied").unwrap();

        assert!(finish_move(&from, &to).is_err());
        assert!(!to.exists());
        assert!(from.is_dir());
    }

    #[test]
    fn test_finish_move_keeps_target_when_source_vanished() {
        let temp_dir = TempDir::new().unwrap();
        let to = temp_dir.path().join("only.txt");
        fs::write(&to, "x").unwrap();

        finish_move(&temp_dir.path().join("gone.txt"), &to).unwrap();
        assert!(to.exists());
    }

    #[test]
    fn test_copy_no_clobber_copies_content() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("a.txt");
        let to = temp_dir.path().join("b.txt");
        fs::write(&from, "payload").unwrap();

        copy_no_clobber(&from, &to).unwrap();
        assert_eq!(fs::read_to_string(&to).unwrap(), "payload");

        let again = copy_no_clobber(&from, &to).unwrap_err();
        assert_eq!(again.kind(), io::ErrorKind::AlreadyExists);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_no_clobber_recreates_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real.jpg");
        fs::write(&real, "x").unwrap();
        let link = temp_dir.path().join("link.jpg");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let to = temp_dir.path().join("moved.jpg");

        copy_no_clobber(&link, &to).unwrap();

        assert!(to.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&to).unwrap(), real);
    }
}
