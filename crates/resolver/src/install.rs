//! Install-time hooks and their file-operation collaborators.
//!
//! These run on a maintenance path, never on the resolution hot path. There
//! is no rollback: a failure part way through leaves the target directory in
//! an intermediate state and is reported as [`InstallError::Io`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use walkdir::WalkDir;

use crate::config::FragmentGrouping;
use crate::error::InstallError;

/// Recursive directory operations.
pub trait TreeInstaller: Send + Sync {
	/// Removes `path` and everything below it.
	fn delete_tree(&self, path: &Path) -> io::Result<()>;

	/// Copies `src` recursively to `dst`. Partial copies are left in place.
	fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// Concatenates resource fragments into one aggregate resource.
pub trait FragmentMerger: Send + Sync {
	/// Appends `files`, in order, onto `<target_dir>/<bundle>`.
	fn append_fragments(&self, bundle: &str, files: &[PathBuf], target_dir: &Path) -> io::Result<()>;
}

/// [`TreeInstaller`] over the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTreeInstaller;

impl TreeInstaller for FsTreeInstaller {
	fn delete_tree(&self, path: &Path) -> io::Result<()> {
		fs::remove_dir_all(path)
	}

	fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()> {
		for entry in WalkDir::new(src) {
			let entry = entry.map_err(io::Error::from)?;
			let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
			let target = dst.join(rel);
			if entry.file_type().is_dir() {
				fs::create_dir_all(&target)?;
			} else {
				if let Some(parent) = target.parent() {
					fs::create_dir_all(parent)?;
				}
				fs::copy(entry.path(), &target)?;
			}
		}
		Ok(())
	}
}

/// [`FragmentMerger`] appending onto files in the local filesystem.
///
/// A newline is inserted between fragments when the content so far does not
/// already end with one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFragmentMerger;

fn ends_with_newline(path: &Path) -> io::Result<bool> {
	let mut file = match File::open(path) {
		Ok(file) => file,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
		Err(e) => return Err(e),
	};
	if file.metadata()?.len() == 0 {
		return Ok(true);
	}
	file.seek(SeekFrom::End(-1))?;
	let mut last = [0u8; 1];
	file.read_exact(&mut last)?;
	Ok(last[0] == b'\n')
}

impl FragmentMerger for FsFragmentMerger {
	fn append_fragments(&self, bundle: &str, files: &[PathBuf], target_dir: &Path) -> io::Result<()> {
		fs::create_dir_all(target_dir)?;
		let target = target_dir.join(bundle);
		let mut terminated = ends_with_newline(&target)?;
		let mut out = OpenOptions::new().create(true).append(true).open(&target)?;
		for file in files {
			let bytes = fs::read(file)?;
			if bytes.is_empty() {
				continue;
			}
			if !terminated {
				out.write_all(b"\n")?;
			}
			out.write_all(&bytes)?;
			terminated = bytes.ends_with(b"\n");
		}
		out.flush()
	}
}

fn install_io(path: &Path) -> impl FnOnce(io::Error) -> InstallError + '_ {
	move |source| InstallError::Io {
		path: path.to_path_buf(),
		source,
	}
}

/// Replaces `staging` with fresh copies of `dirs`, each under its own name.
pub fn stage_directories<P: AsRef<Path>>(
	installer: &dyn TreeInstaller,
	staging: &Path,
	dirs: &[P],
) -> Result<(), InstallError> {
	if staging.exists() {
		installer.delete_tree(staging).map_err(install_io(staging))?;
	}
	fs::create_dir_all(staging).map_err(install_io(staging))?;
	for dir in dirs {
		let dir = dir.as_ref();
		let Some(name) = dir.file_name() else {
			return Err(InstallError::Io {
				path: dir.to_path_buf(),
				source: io::Error::new(io::ErrorKind::InvalidInput, "source directory has no name"),
			});
		};
		installer
			.copy_tree(dir, &staging.join(name))
			.map_err(install_io(dir))?;
	}
	Ok(())
}

/// Groups fragment files by bundle key.
///
/// Groups keep first-seen order and files keep input order inside a group.
/// A path without a file name cannot name a bundle and is rejected.
pub fn group_fragments(
	files: &[PathBuf],
	grouping: FragmentGrouping,
) -> Result<IndexMap<String, Vec<PathBuf>>, InstallError> {
	let mut groups: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
	for file in files {
		let Some(file_name) = file.file_name() else {
			return Err(InstallError::Io {
				path: file.clone(),
				source: io::Error::new(io::ErrorKind::InvalidInput, "fragment path has no file name"),
			});
		};
		let file_name = file_name.to_string_lossy();
		groups
			.entry(grouping.bundle_key(&file_name).to_string())
			.or_default()
			.push(file.clone());
	}
	Ok(groups)
}

/// Groups `files` and appends each group into `target_dir`.
pub fn merge_fragments(
	merger: &dyn FragmentMerger,
	target_dir: &Path,
	files: &[PathBuf],
	grouping: FragmentGrouping,
) -> Result<usize, InstallError> {
	let groups = group_fragments(files, grouping)?;
	for (bundle, members) in &groups {
		merger
			.append_fragments(bundle, members, target_dir)
			.map_err(|source| InstallError::Io {
				path: target_dir.join(bundle),
				source,
			})?;
	}
	Ok(groups.len())
}

#[cfg(test)]
mod tests;
