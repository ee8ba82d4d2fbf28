use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tempfile::tempdir;

use chrono::Local;
use dedupe_organizer::planner::{CategoryTable, CreationYear, TargetPlanner, YearSource};
use dedupe_organizer::{EngineState, SilentReporter};

struct FixedYear(&'static str);

impl YearSource for FixedYear {
    fn year_of(&self, _path: &Path) -> dedupe_organizer::Result<String> {
        Ok(self.0.to_string())
    }
}

fn subdir(year: &str, category: &str) -> String {
    format!("{}{}{}", year, MAIN_SEPARATOR, category)
}

fn state_with(paths: &[PathBuf]) -> EngineState {
    let mut state = EngineState::default();
    for path in paths {
        state.processed_paths.insert(path.clone());
        state.surviving_paths.push(path.clone());
    }
    state
}

fn create_sources(root: &Path, names: &[&str]) -> Vec<PathBuf> {
    fs::create_dir_all(root).unwrap();
    names
        .iter()
        .map(|name| {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, format!("content of {}", name)).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_plan_files_by_year_and_category() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("target");
    let sources = create_sources(
        &tmp.path().join("source"),
        &["notes.txt", "beach.JPG", "Makefile", "scene.blend"],
    );

    let categories = CategoryTable::builtin();
    let planner = TargetPlanner::new(&target, &categories, &FixedYear("2019"));
    let outcome = planner
        .plan(state_with(&sources), &SilentReporter)
        .unwrap();

    assert_eq!(outcome.planned, 4);
    let expected_dirs: Vec<String> = vec![
        subdir("2019", "blend"),
        subdir("2019", "images"),
        subdir("2019", "no-extension"),
        subdir("2019", "text"),
    ];
    let dirs: Vec<String> = outcome.state.target_directories.iter().cloned().collect();
    assert_eq!(dirs, expected_dirs);

    let images = &outcome.state.plan[&subdir("2019", "images")];
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].source, sources[1]);
    assert_eq!(
        images[0].destination,
        target.join("2019").join("images").join("beach.JPG")
    );
}

#[test]
fn test_planning_is_idempotent() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("target");
    let sources = create_sources(
        &tmp.path().join("source"),
        &["a.txt", "b.png", "c.mp3", "d.txt"],
    );

    let categories = CategoryTable::builtin();
    let planner = TargetPlanner::new(&target, &categories, &FixedYear("2020"));
    let first = planner.plan(state_with(&sources), &SilentReporter).unwrap();
    let second = planner.plan(first.state.clone(), &SilentReporter).unwrap();

    assert_eq!(first.state.plan, second.state.plan);
    assert_eq!(
        first.state.target_directories,
        second.state.target_directories
    );
    // Planning never touches the target tree.
    assert!(!target.exists());
}

#[test]
fn test_existing_destination_shrinks_plan() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("target");
    let sources = create_sources(
        &tmp.path().join("source"),
        &["report.pdf", "song.flac", "memo.txt"],
    );

    // A previous copy phase already placed the song.
    let audio_dir = target.join("2022").join("audio");
    fs::create_dir_all(&audio_dir).unwrap();
    fs::write(audio_dir.join("song.flac"), "already copied").unwrap();

    let categories = CategoryTable::builtin();
    let planner = TargetPlanner::new(&target, &categories, &FixedYear("2022"));
    let outcome = planner.plan(state_with(&sources), &SilentReporter).unwrap();

    assert_eq!(outcome.planned, 2);
    assert_eq!(outcome.already_present, 1);
    assert!(!outcome
        .state
        .target_directories
        .contains(&subdir("2022", "audio")));
    assert!(outcome
        .state
        .assignments()
        .all(|(_, a)| a.source != sources[1]));
    assert_eq!(outcome.state.plan[&subdir("2022", "text")].len(), 2);
}

#[test]
fn test_same_name_in_same_bucket_is_planned_once() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("target");
    let sources = create_sources(
        &tmp.path().join("source"),
        &["trip1/IMG_0001.jpg", "trip2/IMG_0001.jpg"],
    );

    let categories = CategoryTable::builtin();
    let planner = TargetPlanner::new(&target, &categories, &FixedYear("2018"));
    let outcome = planner.plan(state_with(&sources), &SilentReporter).unwrap();

    assert_eq!(outcome.planned, 1);
    assert_eq!(outcome.name_collisions, 1);
    let images = &outcome.state.plan[&subdir("2018", "images")];
    assert_eq!(images[0].source, sources[0]);
}

#[test]
fn test_plan_replaces_previous_plan() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("target");
    let sources = create_sources(&tmp.path().join("source"), &["a.txt"]);

    let categories = CategoryTable::builtin();
    let first = TargetPlanner::new(&target, &categories, &FixedYear("2001"))
        .plan(state_with(&sources), &SilentReporter)
        .unwrap();
    let second = TargetPlanner::new(&target, &categories, &FixedYear("2002"))
        .plan(first.state, &SilentReporter)
        .unwrap();

    let dirs: Vec<&String> = second.state.target_directories.iter().collect();
    assert_eq!(dirs, vec![&subdir("2002", "text")]);
    assert_eq!(second.state.plan.len(), 1);
}

#[test]
fn test_creation_year_of_new_file_is_this_year() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("fresh.txt");
    fs::write(&path, "new").unwrap();

    let year = CreationYear.year_of(&path).unwrap();
    assert_eq!(year.len(), 4);
    assert_eq!(year, Local::now().format("%Y").to_string());
}

#[test]
fn test_missing_source_fails_planning() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("target");
    let missing = tmp.path().join("gone.txt");

    let categories = CategoryTable::builtin();
    let planner = TargetPlanner::new(&target, &categories, &CreationYear);
    assert!(planner
        .plan(state_with(&[missing]), &SilentReporter)
        .is_err());
}
