//! CLI Scan Command
//!
//! Headless pipeline: read an image, extract it, auto-select the focal
//! member (or the one asked for), and emit one export.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use kkscan_core::{run_scan, Extractor, ScanSession};
use kkscan_media::ImageIntake;
use tokio::sync::Mutex;
use tracing::info;

use crate::terminal_output::{render_table, Column};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Tab-separated data row
    Row,
    /// Header line plus data row, tab-separated
    Table,
    /// CSV file (written to --out, else printed)
    Csv,
    /// The whole household record as JSON
    Json,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Photo or scan of the family card
    pub image: PathBuf,

    /// Member index to export instead of the automatic choice
    #[arg(short, long)]
    pub member: Option<usize>,

    #[arg(short, long, value_enum, default_value = "row")]
    pub format: ExportFormat,

    /// Directory for the CSV file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the member table to stderr
    #[arg(long)]
    pub list: bool,
}

/// Where the export ended up.
#[derive(Debug, PartialEq, Eq)]
pub enum ScanOutput {
    Stdout(String),
    File(PathBuf),
}

/// Run the pipeline. `default_out` is the configured CSV directory, used
/// when `--out` is absent.
pub async fn execute(
    extractor: &dyn Extractor,
    intake: ImageIntake,
    args: &ScanArgs,
    default_out: Option<&Path>,
) -> Result<ScanOutput> {
    let upload = intake
        .read_file(&args.image)
        .await
        .with_context(|| format!("Cannot use {}", args.image.display()))?;
    let data_uri = intake.accept(&upload)?;

    let session = Mutex::new(ScanSession::new(Duration::ZERO));
    run_scan(&session, extractor, data_uri)
        .await
        .context(kkscan_core::EXTRACTION_FAILED_MESSAGE)?;

    let mut session = session.into_inner();
    if let Some(index) = args.member {
        session.select(index)?;
    }
    if args.list {
        eprint!("{}", member_table(&session)?);
    }

    let now = Instant::now();
    let output = match args.format {
        ExportFormat::Row => ScanOutput::Stdout(session.copy_row(now)?),
        ExportFormat::Table => ScanOutput::Stdout(session.copy_table(now)?),
        ExportFormat::Json => ScanOutput::Stdout(session.copy_json(now)?),
        ExportFormat::Csv => {
            let download = session.download_csv()?;
            match args.out.as_deref().or(default_out) {
                Some(dir) => {
                    tokio::fs::create_dir_all(dir)
                        .await
                        .with_context(|| format!("Failed to create {}", dir.display()))?;
                    let path = dir.join(&download.filename);
                    tokio::fs::write(&path, download.content.as_bytes())
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "CSV written");
                    ScanOutput::File(path)
                }
                None => ScanOutput::Stdout(download.content),
            }
        }
    };
    Ok(output)
}

fn member_table(session: &ScanSession) -> Result<String> {
    let editor = session.editor()?;
    let rows: Vec<Vec<String>> = editor
        .member_options()
        .into_iter()
        .map(|opt| {
            vec![
                if opt.selected { "*".into() } else { String::new() },
                opt.index.to_string(),
                opt.label,
            ]
        })
        .collect();
    Ok(render_table(
        &[Column::left(""), Column::right("#"), Column::left("Anggota")],
        &rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kkscan_understanding::MockExtractor;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const REPLY: &str = r#"{
        "nomorKK": "3301010101010001",
        "dusun": "KRAJAN",
        "anggotaKeluarga": [
            { "namaLengkap": "JOKO", "statusHubungan": "KEPALA KELUARGA", "tanggalLahir": "1980-07-17" },
            { "namaLengkap": "SITI AMINAH", "statusHubungan": "ANAK", "namaAyah": "JOKO" }
        ]
    }"#;

    async fn image_file(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kkscan-scan-{}-{}", tag, std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("kk.png");
        tokio::fs::write(&path, PNG).await.unwrap();
        path
    }

    fn args(image: PathBuf, format: ExportFormat) -> ScanArgs {
        ScanArgs { image, member: None, format, out: None, list: false }
    }

    #[tokio::test]
    async fn row_export_uses_auto_selected_child() {
        let image = image_file("row").await;
        let mock = MockExtractor::new("mock").with_response(REPLY);
        let out = execute(&mock, ImageIntake::default(), &args(image, ExportFormat::Row), None)
            .await
            .unwrap();
        match out {
            ScanOutput::Stdout(row) => {
                let cols: Vec<&str> = row.split('\t').collect();
                assert_eq!(cols[2], "SITI AMINAH");
                assert_eq!(cols[7], "JOKO");
                assert_eq!(cols[9], "17/07/1980");
                assert_eq!(cols[14], "KRAJAN");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn explicit_member_and_csv_file() {
        let image = image_file("csv").await;
        let out_dir = image.parent().unwrap().join("out");
        let mock = MockExtractor::new("mock").with_response(REPLY);
        let mut scan = args(image, ExportFormat::Csv);
        scan.member = Some(0);
        scan.out = Some(out_dir.clone());

        let out = execute(&mock, ImageIntake::default(), &scan, None).await.unwrap();
        assert_eq!(out, ScanOutput::File(out_dir.join("Data_Siswa_JOKO.csv")));
        let content = tokio::fs::read_to_string(out_dir.join("Data_Siswa_JOKO.csv"))
            .await
            .unwrap();
        assert!(content.contains("\"JOKO\""));
    }

    #[tokio::test]
    async fn failures_surface_as_errors() {
        let image = image_file("fail").await;
        let failing = MockExtractor::new("mock").failing();
        let err = execute(&failing, ImageIntake::default(), &args(image.clone(), ExportFormat::Json), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Terjadi kesalahan"));

        let mock = MockExtractor::new("mock").with_response(REPLY);
        let mut scan = args(image, ExportFormat::Row);
        scan.member = Some(5);
        assert!(execute(&mock, ImageIntake::default(), &scan, None).await.is_err());

        let missing = args(PathBuf::from("/nonexistent/kk.png"), ExportFormat::Row);
        assert!(execute(&mock, ImageIntake::default(), &missing, None).await.is_err());
    }
}
