use assert_cmd::Command;
use predicates::prelude::*;

fn data_lines(stdout: &str) -> Vec<&str> {
    stdout.lines().filter(|l| !l.starts_with('#')).collect()
}

#[test]
fn command_build_help() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("qvcal")?;
    cmd.arg("build").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Build a quality value lookup table"));
    Ok(())
}

#[test]
fn command_build_quadrant() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("qvcal")?;
    let output = cmd
        .arg("build")
        .arg("2")
        .arg("2")
        .arg("2")
        .arg("2")
        .arg("-Q")
        .write_stdin(std::fs::read_to_string("tests/qvcal/quadrant.txt")?)
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("# Training bases: 330\n"));
    assert!(stdout.contains("# Deletions: 1\n"));
    assert!(stdout.contains("# Skipped lines: 1\n"));
    assert!(stdout.contains("# Thresholds established: 2 2 2 2\n"));

    // thresholds, then the clean quadrant, then the rest
    assert_eq!(
        data_lines(&stdout),
        vec![
            "1.5 1.5 1.5 1.5",
            "2 2 2 2",
            "20 1 1 1 0",
            "3 1 1 1 1"
        ]
    );
    assert!(stdout.contains("# 20\t1\t300\t297\t3\n"));
    assert!(stdout.contains("# Unaccounted bases: 0\n"));

    Ok(())
}

#[test]
fn command_build_unaccounted() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("qvcal")?;
    let output = cmd
        .arg("build")
        .args(["2", "2", "2", "2"])
        .arg("--infile")
        .arg("tests/qvcal/unaccounted.txt")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(data_lines(&stdout).len(), 3);
    assert!(stdout.contains("\n20 1 1 1 0\n"));
    assert!(stdout.contains("# Unaccounted bases: 12\n"));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("12 of 312 bases unaccounted"));

    Ok(())
}

#[test]
fn command_build_min_incorrect() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("qvcal")?;
    let output = cmd
        .arg("build")
        .args(["2", "2", "2", "2"])
        .args(["--min-incorrect", "2"])
        .args(["-i", "tests/qvcal/unaccounted.txt"])
        .arg("-Q")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    // 10 correct, 2 incorrect
    assert!(stdout.contains("\n8 1 1 1 1\n"));
    assert!(stdout.contains("# Unaccounted bases: 0\n"));

    Ok(())
}

#[test]
fn command_build_six() -> anyhow::Result<()> {
    let tempdir = tempfile::TempDir::new()?;
    let outfile = tempdir.path().join("six.tbl");

    let mut cmd = Command::cargo_bin("qvcal")?;
    cmd.arg("build")
        .args(["3", "3", "2", "3", "2", "2"])
        .args(["-i", "tests/qvcal/six.txt"])
        .args(["-o", outfile.to_str().unwrap()])
        .args(["--parallel", "2"])
        .arg("-Q")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let table = std::fs::read_to_string(&outfile)?;
    assert!(table.contains("# Parameters: 6\n"));
    assert!(table.contains("# Thresholds established: 3 3 2 3 2 2\n"));
    assert!(table.contains("# Training bases: 2000\n"));

    let data = data_lines(&table);
    // 3 threshold rows, then entries with 6 indices each
    assert!(data.len() > 3);
    for line in &data[3..] {
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 7);
        assert!(fields.iter().all(|f| f.parse::<u32>().is_ok()));
    }

    let unaccounted: u64 = table
        .lines()
        .find_map(|l| l.strip_prefix("# Unaccounted bases: "))
        .unwrap()
        .parse()?;
    let binned: u64 = table
        .lines()
        .skip_while(|l| !l.starts_with("# Bases by quality value decade"))
        .skip(2)
        .take_while(|l| !l.starts_with("# Passes"))
        .map(|l| l.split('\t').nth(2).unwrap().parse::<u64>().unwrap())
        .sum();
    assert_eq!(binned + unaccounted, 2000);

    Ok(())
}

#[test]
fn command_build_bad_arguments() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("qvcal")?;
    cmd.arg("build")
        .args(["2", "2", "2"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 4 or 6"));

    let mut cmd = Command::cargo_bin("qvcal")?;
    cmd.arg("build")
        .args(["2", "0", "2", "2"])
        .write_stdin("")
        .assert()
        .failure();

    let mut cmd = Command::cargo_bin("qvcal")?;
    cmd.arg("build")
        .args(["2", "x", "2", "2"])
        .assert()
        .failure();

    let mut cmd = Command::cargo_bin("qvcal")?;
    cmd.arg("build")
        .args(["2", "2", "2", "2"])
        .args(["-i", "tests/qvcal/no-such-file.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not open"));

    Ok(())
}

#[test]
fn command_build_empty_input() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("qvcal")?;
    cmd.arg("build")
        .args(["2", "2", "2", "2"])
        .write_stdin("# nothing here\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No training bases"));

    Ok(())
}
