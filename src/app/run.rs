use std::path::PathBuf;

use clap::{ArgGroup, Args};
use tracing::info;

use super::progress::ExtractionBar;
use super::{App, AppError, export_extracted, export_merged, save};
use crate::pipeline::DEFAULT_QUERY;
use crate::records::{EXTRACTED_FILE_NAME, MERGED_FILE_NAME};
use crate::session::Session;

/// Extract emails for every row of one input without prompting.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("input").required(true).args(["csv", "sheet"])))]
pub struct RunArgs {
    /// CSV file with a header row
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Google Sheets share URL (reads Sheet1)
    #[arg(long, value_name = "URL")]
    pub sheet: Option<String>,

    /// Column holding the company names
    #[arg(long)]
    pub column: String,

    /// Search query template; `{company}` is replaced by each name
    #[arg(long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Output file (defaults to extracted_results.csv, or complete_dataset.csv with --merged)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Write the whole input table with an `email` column instead of the raw results
    #[arg(long)]
    pub merged: bool,

    /// Also write the results back into the source sheet (needs --sheet)
    #[arg(long, conflicts_with = "csv")]
    pub update_sheet: bool,
}

impl RunArgs {
    fn out_path(&self) -> PathBuf {
        self.out.clone().unwrap_or_else(|| {
            PathBuf::from(if self.merged {
                MERGED_FILE_NAME
            } else {
                EXTRACTED_FILE_NAME
            })
        })
    }
}

pub async fn run(app: &App, args: RunArgs) -> Result<(), AppError> {
    if args.update_sheet && args.sheet.is_none() {
        return Err(AppError::NotASheet);
    }
    let mut session = Session::new();

    let table = match (&args.csv, &args.sheet) {
        (Some(path), _) => app.load_csv(&mut session, path)?,
        (None, Some(url)) => app.load_sheet(&mut session, url).await?,
        (None, None) => return Err(AppError::NoInput),
    };
    let bar = ExtractionBar::new(table.len());

    let outcome = app
        .extract(&mut session, &args.column, &args.query, |p| bar.update(p))
        .await;
    match outcome {
        Ok(records) => {
            bar.finish("done");
            info!(records = records.len(), "extraction finished");
        }
        Err(e) => {
            bar.abandon();
            return Err(e);
        }
    }

    let contents = if args.merged {
        export_merged(&session, &args.column)?
    } else {
        export_extracted(&session)?
    };
    save(&args.out_path(), &contents)?;

    if args.update_sheet {
        let summary = app.update_sheet(&session).await?;
        info!(
            range = summary.updated_range.as_deref().unwrap_or_default(),
            cells = summary.updated_cells.unwrap_or_default(),
            "Google Sheet updated successfully"
        );
    }
    Ok(())
}
