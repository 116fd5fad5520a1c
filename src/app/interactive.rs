//! Terminal menu driving one session: pick an input, pick a column and a
//! query, then extract, download or write back.

use std::path::PathBuf;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use tracing::debug;

use super::progress::ExtractionBar;
use super::{App, AppError, export_extracted, export_merged, save};
use crate::pipeline::DEFAULT_QUERY;
use crate::records::{EXTRACTED_FILE_NAME, MERGED_FILE_NAME};
use crate::session::{InputMethod, Session};

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Extract,
    DownloadExtracted,
    DownloadMerged,
    UpdateSheet,
    ChangeQuery,
    ChangeInput,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Extract => "Extract emails",
            Action::DownloadExtracted => "Download extracted results",
            Action::DownloadMerged => "Download complete dataset",
            Action::UpdateSheet => "Update Google Sheet",
            Action::ChangeQuery => "Change column or query",
            Action::ChangeInput => "Load a different input",
            Action::Quit => "Quit",
        }
    }
}

/// Actions offered for the current session state.
fn available_actions(session: &Session) -> Vec<Action> {
    let mut actions = vec![Action::Extract];
    if session.results().is_some() {
        actions.push(Action::DownloadExtracted);
        actions.push(Action::DownloadMerged);
        if session.input_method() == Some(InputMethod::Sheet) {
            actions.push(Action::UpdateSheet);
        }
    }
    actions.extend([Action::ChangeQuery, Action::ChangeInput, Action::Quit]);
    actions
}

/// Column and query template chosen for the loaded table.
struct Selection {
    column: String,
    query: String,
}

struct Menu<'a> {
    app: &'a App,
    theme: ColorfulTheme,
    session: Session,
}

impl<'a> Menu<'a> {
    fn new(app: &'a App) -> Self {
        Self {
            app,
            theme: ColorfulTheme::default(),
            session: Session::new(),
        }
    }

    fn print_error(&self, err: &AppError) {
        println!("{}", style(err).red());
    }

    fn print_success(&self, msg: &str) {
        println!("{}", style(msg).green());
    }

    /// Prompt for an input until one loads with at least a header row.
    async fn choose_input(&mut self) -> Result<(), AppError> {
        loop {
            let labels: Vec<&str> = InputMethod::ALL.iter().map(|m| m.label()).collect();
            let default = self
                .session
                .input_method()
                .and_then(|m| InputMethod::ALL.iter().position(|&x| x == m))
                .unwrap_or(0);
            let choice = Select::with_theme(&self.theme)
                .with_prompt("Choose input method")
                .items(&labels)
                .default(default)
                .interact()?;

            let loaded = match InputMethod::ALL[choice] {
                InputMethod::Csv => {
                    let path: String = Input::with_theme(&self.theme)
                        .with_prompt("Path to CSV file")
                        .interact_text()?;
                    let path = PathBuf::from(path.trim());
                    self.app.load_csv(&mut self.session, &path)
                }
                InputMethod::Sheet => {
                    let url: String = Input::with_theme(&self.theme)
                        .with_prompt("Enter Google Sheets URL")
                        .interact_text()?;
                    self.app.load_sheet(&mut self.session, url.trim()).await
                }
            };

            match loaded {
                Ok(table) if table.is_empty() => {
                    println!("{}", style("The input has no header row.").yellow());
                }
                Ok(table) => {
                    println!();
                    println!("{}", style("Data preview").bold());
                    print!("{}", table.preview(PREVIEW_ROWS));
                    println!();
                    return Ok(());
                }
                Err(e) if e.is_recoverable() => self.print_error(&e),
                Err(e) => return Err(e),
            }
        }
    }

    fn choose_selection(&self) -> Result<Option<Selection>, AppError> {
        let Some(table) = self.session.table() else {
            return Ok(None);
        };
        let column = Select::with_theme(&self.theme)
            .with_prompt("Select the column containing company names")
            .items(&table.headers)
            .default(0)
            .interact()?;
        let query: String = Input::with_theme(&self.theme)
            .with_prompt("Enter your search query")
            .default(DEFAULT_QUERY.to_string())
            .interact_text()?;

        Ok(Some(Selection {
            column: table.headers[column].clone(),
            query,
        }))
    }

    async fn extract(&mut self, selection: &Selection) -> Result<(), AppError> {
        let total = self.session.table().map_or(0, |t| t.len());
        let bar = ExtractionBar::new(total);
        let outcome = self
            .app
            .extract(&mut self.session, &selection.column, &selection.query, |p| {
                bar.update(p)
            })
            .await;

        match outcome {
            Ok(records) => {
                bar.finish("done");
                for record in records {
                    println!("{}: {}", record.entity, record.value);
                }
                self.print_success("Extraction completed!");
            }
            Err(e) => {
                bar.abandon();
                return Err(e);
            }
        }
        println!(
            "{}",
            style(format!("Search calls so far: {}", self.session.search_count())).dim()
        );
        Ok(())
    }

    fn download(&self, merged: bool, column: &str) -> Result<(), AppError> {
        let (contents, default_name) = if merged {
            (export_merged(&self.session, column)?, MERGED_FILE_NAME)
        } else {
            (export_extracted(&self.session)?, EXTRACTED_FILE_NAME)
        };
        let path: String = Input::with_theme(&self.theme)
            .with_prompt("Save as")
            .default(default_name.to_string())
            .interact_text()?;
        save(PathBuf::from(path.trim()).as_path(), &contents)?;
        self.print_success(&format!("Saved {}", path.trim()));
        Ok(())
    }

    async fn update_sheet(&self) -> Result<(), AppError> {
        self.app.update_sheet(&self.session).await?;
        self.print_success("Google Sheet updated successfully!");
        Ok(())
    }

    async fn handle(&mut self, action: Action, selection: &Selection) -> Result<(), AppError> {
        match action {
            Action::Extract => self.extract(selection).await,
            Action::DownloadExtracted => self.download(false, &selection.column),
            Action::DownloadMerged => self.download(true, &selection.column),
            Action::UpdateSheet => self.update_sheet().await,
            Action::ChangeQuery | Action::ChangeInput | Action::Quit => Ok(()),
        }
    }

    async fn run(&mut self) -> Result<(), AppError> {
        println!();
        println!("{}", style("Company Email Extractor").bold());

        'input: loop {
            self.choose_input().await?;
            let Some(mut selection) = self.choose_selection()? else {
                continue;
            };

            loop {
                let actions = available_actions(&self.session);
                let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
                let choice = Select::with_theme(&self.theme)
                    .with_prompt("Select action")
                    .items(&labels)
                    .default(0)
                    .interact()?;
                let action = actions[choice];
                debug!(?action, "menu action");

                match action {
                    Action::Quit => return Ok(()),
                    Action::ChangeInput => {
                        debug!(completed = self.session.is_completed(), "changing input");
                        continue 'input;
                    }
                    Action::ChangeQuery => match self.choose_selection()? {
                        Some(s) => selection = s,
                        None => continue 'input,
                    },
                    _ => match self.handle(action, &selection).await {
                        Ok(()) => {}
                        Err(e) if e.is_recoverable() => self.print_error(&e),
                        Err(e) => return Err(e),
                    },
                }
            }
        }
    }
}

/// Run the interactive menu until the user quits.
pub async fn run(app: &App) -> Result<(), AppError> {
    Menu::new(app).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ExtractionRecord;
    use crate::table::Table;

    fn loaded(method: InputMethod) -> Session {
        let mut session = Session::new();
        session.select_method(method);
        session.load_table(Table::new(vec!["Company".into()], vec![vec!["Acme".into()]]));
        session
    }

    #[test]
    fn downloads_hidden_until_extraction_completes() {
        let session = loaded(InputMethod::Csv);
        let actions = available_actions(&session);
        assert_eq!(
            actions,
            [Action::Extract, Action::ChangeQuery, Action::ChangeInput, Action::Quit]
        );
    }

    #[test]
    fn update_sheet_offered_only_for_sheet_input() {
        let mut csv = loaded(InputMethod::Csv);
        csv.finish_extraction(vec![ExtractionRecord::new("Acme", "a@x.com")]);
        assert!(available_actions(&csv).contains(&Action::DownloadMerged));
        assert!(!available_actions(&csv).contains(&Action::UpdateSheet));

        let mut sheet = loaded(InputMethod::Sheet);
        sheet.finish_extraction(vec![ExtractionRecord::new("Acme", "a@x.com")]);
        assert!(available_actions(&sheet).contains(&Action::UpdateSheet));
    }
}
