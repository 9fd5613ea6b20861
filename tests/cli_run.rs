use clap::Parser;
use labtab::{
    cli::{dispatch, Args},
    report::JobReport,
    table::LabTable,
};
use std::path::{Path, PathBuf};

const CONFIG: &str = r#"
[selection]
metrics = ["PLT", "WBC"]

[security]
reject_url_inputs = true
max_input_file_bytes = 100
"#;

struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::write(root.join("labtab.toml"), CONFIG).unwrap();
        Self { _dir: dir, root }
    }

    fn write(&self, name: &str, body: &str) -> String {
        let p = self.root.join(name);
        std::fs::write(&p, body).unwrap();
        p.display().to_string()
    }

    fn out(&self) -> PathBuf {
        self.root.join("out")
    }

    fn run(&self, inputs: &[String]) -> anyhow::Result<()> {
        let config = self.root.join("labtab.toml").display().to_string();
        let out = self.out().display().to_string();
        let mut argv = vec!["labtab", "--config", &config, "run", "--out-dir", &out];
        for i in inputs {
            argv.push("--input");
            argv.push(i);
        }
        dispatch(Args::try_parse_from(argv)?)
    }

    fn job_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(self.out())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        dirs.sort();
        dirs
    }
}

fn read_json<T: serde::de::DeserializeOwned>(p: &Path) -> T {
    serde_json::from_str(&std::fs::read_to_string(p).unwrap()).unwrap()
}

#[test]
fn oversized_file_is_reported_and_the_rest_is_exported() {
    let ws = Workspace::new();
    let good = ws.write("a_210305.txt", "PLT 245\nWBC 7,2\n");
    let big = ws.write("b_210401.txt", &format!("PLT 250\n{}", "#".repeat(400)));

    ws.run(&[good, big]).unwrap();

    let dirs = ws.job_dirs();
    assert_eq!(dirs.len(), 1);
    let job = &dirs[0];
    for rel in [
        "final/table.csv",
        "final/table.md",
        "final/table.json",
        "final/series.json",
        "final/debug.csv",
        "final/report.json",
        "index.json",
        "effective-config.toml",
        "logs/labtab.log",
    ] {
        assert!(job.join(rel).is_file(), "missing {rel}");
    }

    let report: JobReport = read_json(&job.join("final/report.json"));
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    let failed = &report.files[1];
    assert_eq!(failed.file, "b_210401.txt");
    assert!(failed
        .error
        .as_deref()
        .unwrap()
        .contains("max_input_file_bytes"));

    let table: LabTable = read_json(&job.join("final/table.json"));
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].file, "a_210305.txt");
    assert_eq!(table.rows[0].values.get("WBC"), Some(&7.2));

    let index: serde_json::Value = read_json(&job.join("index.json"));
    assert_eq!(index["status"], "partial");
    assert_eq!(index["failed"], 1);
    assert_eq!(
        index["job_id"].as_str(),
        job.file_name().and_then(|n| n.to_str())
    );

    let csv = std::fs::read_to_string(job.join("final/table.csv")).unwrap();
    assert_eq!(
        csv,
        "Date,File,PLT (Αιμοπετάλια),WBC (Λευκά)\n05/03/2021,a_210305.txt,245,7.2\n"
    );
}

#[test]
fn missing_input_fails_alone() {
    let ws = Workspace::new();
    let good = ws.write("a_210305.txt", "PLT 245\n");
    let gone = ws.root.join("gone_210101.txt").display().to_string();

    ws.run(&[gone, good]).unwrap();

    let job = &ws.job_dirs()[0];
    let report: JobReport = read_json(&job.join("final/report.json"));
    assert_eq!((report.processed, report.failed), (1, 1));
    assert!(!report.files[0].ok);
    assert!(report.files[1].ok);
    let index: serde_json::Value = read_json(&job.join("index.json"));
    assert_eq!(index["status"], "partial");
}

#[test]
fn same_inputs_reuse_the_job_dir() {
    let ws = Workspace::new();
    let good = ws.write("a_210305.txt", "PLT 245\n");

    ws.run(std::slice::from_ref(&good)).unwrap();
    ws.run(std::slice::from_ref(&good)).unwrap();
    assert_eq!(ws.job_dirs().len(), 1);

    let index: serde_json::Value = read_json(&ws.job_dirs()[0].join("index.json"));
    assert_eq!(index["status"], "ok");
    assert_eq!(index["metrics"], serde_json::json!(["PLT", "WBC"]));
}

#[test]
fn directory_without_reports_is_an_error() {
    let ws = Workspace::new();
    let docs = ws.root.join("docs");
    std::fs::create_dir(&docs).unwrap();
    std::fs::write(docs.join("notes.docx"), b"x").unwrap();

    let err = ws.run(&[docs.display().to_string()]).unwrap_err();
    assert!(err.to_string().contains("no report files"));
    assert!(!ws.out().exists());
}
