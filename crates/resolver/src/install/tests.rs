use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rstest::rstest;

use super::*;

fn write(path: &Path, content: &str) {
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, content).unwrap();
}

/// Records merger calls instead of touching the filesystem.
#[derive(Default)]
struct RecordingMerger {
	calls: Mutex<Vec<(String, Vec<PathBuf>)>>,
}

impl FragmentMerger for RecordingMerger {
	fn append_fragments(&self, bundle: &str, files: &[PathBuf], _target_dir: &Path) -> io::Result<()> {
		self.calls.lock().push((bundle.to_string(), files.to_vec()));
		Ok(())
	}
}

struct FailingInstaller;

impl TreeInstaller for FailingInstaller {
	fn delete_tree(&self, _path: &Path) -> io::Result<()> {
		Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
	}

	fn copy_tree(&self, _src: &Path, _dst: &Path) -> io::Result<()> {
		Err(io::Error::other("disk full"))
	}
}

#[test]
fn copy_tree_duplicates_nested_content() {
	let src = tempfile::tempdir().expect("must create tempdir");
	let dst = tempfile::tempdir().expect("must create tempdir");
	write(&src.path().join("a/b/c.txt"), "deep");
	write(&src.path().join("top.txt"), "top");
	fs::create_dir_all(src.path().join("empty")).unwrap();

	let target = dst.path().join("copy");
	FsTreeInstaller.copy_tree(src.path(), &target).unwrap();

	assert_eq!(fs::read_to_string(target.join("a/b/c.txt")).unwrap(), "deep");
	assert_eq!(fs::read_to_string(target.join("top.txt")).unwrap(), "top");
	assert!(target.join("empty").is_dir());
}

#[test]
fn staging_replaces_previous_content() {
	let home = tempfile::tempdir().expect("must create tempdir");
	let staging = home.path().join("WEB-INF/dev");
	write(&staging.join("stale/old.txt"), "old");

	let module = home.path().join("src/module-a");
	write(&module.join("x.class"), "x");

	stage_directories(&FsTreeInstaller, &staging, &[&module]).unwrap();

	assert!(!staging.join("stale").exists());
	assert_eq!(fs::read_to_string(staging.join("module-a/x.class")).unwrap(), "x");
}

#[test]
fn staging_with_no_dirs_leaves_empty_directory() {
	let home = tempfile::tempdir().expect("must create tempdir");
	let staging = home.path().join("dev");
	write(&staging.join("old.txt"), "old");

	stage_directories::<PathBuf>(&FsTreeInstaller, &staging, &[]).unwrap();

	assert!(staging.is_dir());
	assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
}

#[test]
fn staging_surfaces_delete_failure() {
	let home = tempfile::tempdir().expect("must create tempdir");
	let staging = home.path().join("dev");
	fs::create_dir_all(&staging).unwrap();

	let err = stage_directories::<PathBuf>(&FailingInstaller, &staging, &[]).unwrap_err();
	match err {
		InstallError::Io { path, source } => {
			assert_eq!(path, staging);
			assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
		}
		other => panic!("unexpected error {other:?}"),
	}
}

#[test]
fn staging_surfaces_copy_failure_with_source_path() {
	let home = tempfile::tempdir().expect("must create tempdir");
	let staging = home.path().join("dev");
	let module = home.path().join("module");
	fs::create_dir_all(&module).unwrap();

	let err = stage_directories(&FailingInstaller, &staging, &[&module]).unwrap_err();
	assert!(matches!(err, InstallError::Io { ref path, .. } if *path == module));
}

#[rstest]
#[case(FragmentGrouping::FileName, 3)]
#[case(FragmentGrouping::BundleName, 2)]
fn grouping_policy_controls_group_count(#[case] grouping: FragmentGrouping, #[case] groups: usize) {
	let files = vec![
		PathBuf::from("a/messages.properties.en"),
		PathBuf::from("b/messages.properties.fr"),
		PathBuf::from("c/labels.properties.en"),
	];
	assert_eq!(group_fragments(&files, grouping).unwrap().len(), groups);
}

#[test]
fn bundle_grouping_keeps_first_seen_and_input_order() {
	let files = vec![
		PathBuf::from("x/labels.properties.2"),
		PathBuf::from("x/messages.properties.1"),
		PathBuf::from("y/labels.properties.1"),
	];
	let merger = RecordingMerger::default();
	let count = merge_fragments(&merger, Path::new("/unused"), &files, FragmentGrouping::BundleName).unwrap();

	assert_eq!(count, 2);
	let calls = merger.calls.lock();
	assert_eq!(calls[0].0, "labels.properties");
	assert_eq!(
		calls[0].1,
		vec![PathBuf::from("x/labels.properties.2"), PathBuf::from("y/labels.properties.1")]
	);
	assert_eq!(calls[1].0, "messages.properties");
}

#[test]
fn file_name_grouping_never_merges_distinct_files() {
	let files = vec![PathBuf::from("a/m.properties.en"), PathBuf::from("b/m.properties.fr")];
	let merger = RecordingMerger::default();
	merge_fragments(&merger, Path::new("/unused"), &files, FragmentGrouping::FileName).unwrap();

	let calls = merger.calls.lock();
	assert_eq!(calls.len(), 2);
	assert!(calls.iter().all(|(_, members)| members.len() == 1));
}

#[test]
fn fs_merger_appends_in_order_with_separators() {
	let dir = tempfile::tempdir().expect("must create tempdir");
	let first = dir.path().join("frag/one");
	let second = dir.path().join("frag/two");
	write(&first, "a=1");
	write(&second, "b=2\n");

	let target = dir.path().join("classes");
	write(&target.join("messages.properties"), "base=0");

	FsFragmentMerger
		.append_fragments("messages.properties", &[first, second], &target)
		.unwrap();

	assert_eq!(
		fs::read_to_string(target.join("messages.properties")).unwrap(),
		"base=0\na=1\nb=2\n"
	);
}

#[test]
fn fs_merger_reports_missing_fragment() {
	let dir = tempfile::tempdir().expect("must create tempdir");
	let err = FsFragmentMerger
		.append_fragments("m", &[dir.path().join("nope")], dir.path())
		.unwrap_err();
	assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[rstest]
#[case(PathBuf::from("/"))]
#[case(PathBuf::from("frags/.."))]
#[case(PathBuf::from(""))]
fn fragment_paths_without_file_name_are_rejected(#[case] bad: PathBuf) {
	let files = vec![PathBuf::from("a/messages.properties.en"), bad.clone()];
	let merger = RecordingMerger::default();

	let err = merge_fragments(&merger, Path::new("/unused"), &files, FragmentGrouping::FileName).unwrap_err();
	match err {
		InstallError::Io { path, source } => {
			assert_eq!(path, bad);
			assert_eq!(source.kind(), io::ErrorKind::InvalidInput);
		}
		other => panic!("unexpected error {other:?}"),
	}
	assert!(merger.calls.lock().is_empty());
}
