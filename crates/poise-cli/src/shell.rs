//! Numbered menu shell
//!
//! Reads a menu choice, runs one operation against the project database and
//! prints the outcome. Operation failures are reported and the menu comes
//! back; only closed input or option 8 end the loop.

use crate::input::LineSource;
use chrono::NaiveDate;
use poise_core::commands::{
    PartyChoice, PartyChoices, PartyDetails, PartyRepository, PartyRole, ProjectDetail,
    ProjectFields, ProjectRepository,
};
use poise_core::storage::Database;
use poise_core::{Error, Result};
use std::io::{self, Write};
use tracing::{debug, info, warn};

const DIVIDER: &str = "=======================";

/// Top-level menu entries, numbered 1 to 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Fetch,
    Edit,
    Add,
    Finalize,
    Incomplete,
    Overdue,
    Delete,
    Exit,
}

impl MenuOption {
    pub const ALL: [MenuOption; 8] = [
        MenuOption::Fetch,
        MenuOption::Edit,
        MenuOption::Add,
        MenuOption::Finalize,
        MenuOption::Incomplete,
        MenuOption::Overdue,
        MenuOption::Delete,
        MenuOption::Exit,
    ];

    pub fn from_number(number: i64) -> Option<Self> {
        usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fetch => "Fetch Project Information",
            Self::Edit => "Edit Project Information",
            Self::Add => "Add New Project",
            Self::Finalize => "Finalize Existing Project",
            Self::Incomplete => "Find Incomplete Projects",
            Self::Overdue => "Find Overdue Projects",
            Self::Delete => "Delete Project",
            Self::Exit => "Exit",
        }
    }
}

/// Interactive menu over one database
pub struct Shell<'a, S, W> {
    db: &'a Database,
    input: S,
    out: W,
    max_attempts: u32,
    quiet: bool,
}

impl<'a, S: LineSource, W: Write> Shell<'a, S, W> {
    pub fn new(db: &'a Database, input: S, out: W) -> Self {
        Self {
            db,
            input,
            out,
            max_attempts: 3,
            quiet: false,
        }
    }

    /// How many times a yes/no question is asked before the operation is abandoned
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Skip printing the option list before each prompt
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run the menu until the user exits or input runs out
    pub async fn run(&mut self) -> Result<()> {
        info!("Shell started");
        loop {
            match self.step().await {
                Ok(true) => {}
                Ok(false) => break,
                Err(Error::UserCancelled) => {
                    debug!("Input closed, leaving shell");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// One menu round. Returns `false` once the user picked Exit.
    async fn step(&mut self) -> Result<bool> {
        self.print_menu()?;
        let choice = self.read_number("Choose an option (1, 2, 3, 4, 5, 6, 7, or 8)")?;

        let Some(option) = MenuOption::from_number(choice) else {
            writeln!(
                self.out,
                "Invalid option. Please choose 1, 2, 3, 4, 5, 6, 7, or 8."
            )?;
            return Ok(true);
        };
        debug!(?option, "Menu option selected");

        let outcome = match option {
            MenuOption::Fetch => self.fetch_project().await,
            MenuOption::Edit => self.edit_project().await,
            MenuOption::Add => self.add_project().await,
            MenuOption::Finalize => self.finalize_project().await,
            MenuOption::Incomplete => self.list_incomplete().await,
            MenuOption::Overdue => self.list_overdue().await,
            MenuOption::Delete => self.delete_project().await,
            MenuOption::Exit => {
                writeln!(self.out, "Exiting the program. Goodbye!")?;
                return Ok(false);
            }
        };

        match outcome {
            Ok(()) => Ok(true),
            Err(e @ (Error::UserCancelled | Error::Io(_))) => Err(e),
            Err(e) => {
                self.report(&e)?;
                Ok(true)
            }
        }
    }

    fn print_menu(&mut self) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.out)?;
        for option in MenuOption::ALL {
            writeln!(self.out, "{}. {}", option.number(), option.label())?;
        }
        Ok(())
    }

    fn report(&mut self, error: &Error) -> Result<()> {
        match error {
            Error::DatabaseError(_) | Error::MissingGeneratedId(_) => {
                warn!(code = error.code(), %error, "Menu operation failed");
            }
            _ => debug!(code = error.code(), %error, "Menu operation rejected"),
        }
        writeln!(self.out, "{}", error)?;
        if let Some(hint) = error.suggestion() {
            writeln!(self.out, "Hint: {}", hint)?;
        }
        Ok(())
    }

    // Operations

    async fn fetch_project(&mut self) -> Result<()> {
        let project_num = self.read_number("Enter Project Number")?;
        let detail = ProjectRepository::new(self.db).fetch(project_num).await?;
        self.print_detail(&detail)
    }

    async fn edit_project(&mut self) -> Result<()> {
        let project_num = self.read_number("Enter Project Number")?;
        let projects = ProjectRepository::new(self.db);
        if !projects.exists(project_num).await? {
            return Err(Error::ProjectNotFound(project_num));
        }

        writeln!(
            self.out,
            "Choose the field to update for Project Number {}:",
            project_num
        )?;
        writeln!(self.out, "1. Project Information")?;
        for (offset, role) in PartyRole::ALL.into_iter().enumerate() {
            writeln!(self.out, "{}. {} Information", offset + 2, role)?;
        }

        let choice = self.read_number("Enter your choice (1-4)")?;
        match choice {
            1 => {
                let fields = self.read_project_fields()?;
                projects.update(project_num, &fields).await?;
                writeln!(self.out, "Project information updated successfully!")?;
            }
            2..=4 => {
                let role = PartyRole::ALL[(choice - 2) as usize];
                self.edit_party(project_num, role).await?;
            }
            _ => writeln!(self.out, "Invalid choice. No updates performed.")?,
        }
        Ok(())
    }

    async fn edit_party(&mut self, project_num: i64, role: PartyRole) -> Result<()> {
        writeln!(
            self.out,
            "Do you want to edit the existing {} or assign a new {}?",
            role, role
        )?;
        let answer = self.ask("Enter 'edit' or 'new'")?.to_lowercase();
        let parties = PartyRepository::new(self.db);

        match answer.as_str() {
            "edit" => {
                writeln!(
                    self.out,
                    "Enter updated information for existing {} with Project Number {}:",
                    role, project_num
                )?;
                let details = self.read_party_details()?;
                parties
                    .update_for_project(project_num, role, &details)
                    .await?;
                writeln!(self.out, "Existing {} information updated successfully!", role)?;
            }
            "new" => {
                writeln!(
                    self.out,
                    "Enter information for the new {} to be assigned to Project Number {}:",
                    role, project_num
                )?;
                let details = self.read_party_details()?;
                let id = parties.assign_new(project_num, role, &details).await?;
                writeln!(
                    self.out,
                    "New {} (ID {}) assigned to Project Number {} successfully!",
                    role, id, project_num
                )?;
            }
            _ => writeln!(self.out, "Invalid choice. No updates performed.")?,
        }
        Ok(())
    }

    async fn add_project(&mut self) -> Result<()> {
        writeln!(self.out, "Enter information for the new project:")?;
        let project_num = self.read_number("Project Number")?;
        let projects = ProjectRepository::new(self.db);
        if projects.exists(project_num).await? {
            return Err(Error::ProjectExists(project_num));
        }

        let fields = self.read_project_fields()?;
        let choices = PartyChoices {
            customer: self.choose_party(PartyRole::Customer).await?,
            architect: self.choose_party(PartyRole::Architect).await?,
            contractor: self.choose_party(PartyRole::Contractor).await?,
        };

        // Nothing is written until every answer is in
        projects
            .create_with_parties(project_num, &fields, &choices)
            .await?;
        writeln!(self.out, "New project added successfully!")?;
        Ok(())
    }

    /// Ask for a new party's details or an existing party's id
    async fn choose_party(&mut self, role: PartyRole) -> Result<PartyChoice> {
        if self.ask_yes_no(&format!("Is this a new {}? (yes/no)", role))? {
            writeln!(self.out, "Enter information for the new {}:", role)?;
            return Ok(PartyChoice::New(self.read_party_details()?));
        }

        let id = self.read_number(&format!("{} ID", role))?;
        if PartyRepository::new(self.db).get(role, id).await?.is_none() {
            return Err(Error::InvalidInput(format!("no {} with ID {}", role, id)));
        }
        Ok(PartyChoice::Existing(id))
    }

    async fn finalize_project(&mut self) -> Result<()> {
        let project_num = self.read_number("Enter Project Number")?;
        let completed = ProjectRepository::new(self.db).finalize(project_num).await?;
        writeln!(
            self.out,
            "Project finalized successfully. Completion date: {}",
            completed
        )?;
        Ok(())
    }

    async fn list_incomplete(&mut self) -> Result<()> {
        let projects = ProjectRepository::new(self.db).list_incomplete().await?;
        if projects.is_empty() {
            writeln!(self.out, "No projects need to be completed.")?;
            return Ok(());
        }

        for project in projects {
            writeln!(self.out, "Project Number: {}", project.project_num)?;
            writeln!(self.out, "Project Name: {}", project.name)?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    async fn list_overdue(&mut self) -> Result<()> {
        let projects = ProjectRepository::new(self.db).list_overdue().await?;
        if projects.is_empty() {
            writeln!(self.out, "No overdue projects.")?;
            return Ok(());
        }

        for project in projects {
            writeln!(self.out, "Project Number: {}", project.project_num)?;
            writeln!(self.out, "Project Name: {}", project.name)?;
            writeln!(self.out, "Project Deadline: {}", project.deadline)?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    async fn delete_project(&mut self) -> Result<()> {
        let project_num = self.read_number("Enter Project Number")?;
        let answer = self.ask("Are you sure you want to delete this project? (yes/no)")?;
        if !answer.eq_ignore_ascii_case("yes") {
            writeln!(self.out, "Deletion canceled by user.")?;
            return Ok(());
        }

        let deleted = ProjectRepository::new(self.db).delete(project_num).await?;
        writeln!(
            self.out,
            "Project with project_num {} and related information has been deleted.",
            deleted.project_num
        )?;
        for (role, id) in &deleted.kept {
            writeln!(
                self.out,
                "{} {} was kept because another project still references it.",
                role, id
            )?;
        }
        Ok(())
    }

    // Rendering

    fn print_detail(&mut self, detail: &ProjectDetail) -> Result<()> {
        let project = &detail.project;
        let fields = &project.fields;

        writeln!(self.out, "{}", DIVIDER)?;
        writeln!(self.out, "Project Details:")?;
        writeln!(self.out, "Project Number: {}", project.project_num)?;
        writeln!(self.out, "Project Name: {}", fields.name)?;
        writeln!(self.out, "Building Type: {}", fields.building_type)?;
        writeln!(self.out, "Physical Address: {}", fields.physical_address)?;
        writeln!(self.out, "ERF Number: {}", fields.erf_num)?;
        writeln!(self.out, "Total Fee: {}", fields.total_fee)?;
        writeln!(self.out, "Total Paid: {}", fields.total_paid)?;
        writeln!(self.out, "Project Deadline: {}", fields.deadline)?;

        for role in PartyRole::ALL {
            writeln!(self.out, "{} Details:", role)?;
            match detail.party(role) {
                Some(party) => {
                    writeln!(self.out, "{} Name: {}", role, party.name)?;
                    writeln!(self.out, "{} Cell Number: {}", role, party.cell_number)?;
                    writeln!(self.out, "{} Email: {}", role, party.email)?;
                    writeln!(self.out, "{} Address: {}", role, party.address)?;
                }
                None => writeln!(self.out, "No {} on record.", role)?,
            }
        }

        writeln!(self.out, "Finalized: {}", project.finalized)?;
        match project.completion_date {
            Some(date) => writeln!(self.out, "Date of Completion: {}", date)?,
            None => writeln!(self.out, "Date of Completion: Not completed")?,
        }
        writeln!(self.out, "{}", DIVIDER)?;
        Ok(())
    }

    // Prompts

    /// Read one trimmed answer; closed input becomes `UserCancelled` and
    /// undecodable input `InvalidInput`
    fn ask(&mut self, label: &str) -> Result<String> {
        match self.input.read_line(&format!("{}: ", label)) {
            Ok(Some(line)) => Ok(line.trim().to_string()),
            Ok(None) => Err(Error::UserCancelled),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                Err(Error::InvalidInput(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_number(&mut self, label: &str) -> Result<i64> {
        loop {
            let answer = self.ask(label)?;
            match answer.parse::<i64>() {
                Ok(number) => return Ok(number),
                Err(_) => writeln!(self.out, "Invalid input. Please enter a valid number.")?,
            }
        }
    }

    fn read_date(&mut self, label: &str) -> Result<NaiveDate> {
        loop {
            let answer = self.ask(label)?;
            match NaiveDate::parse_from_str(&answer, "%Y-%m-%d") {
                Ok(date) => return Ok(date),
                Err(_) => writeln!(
                    self.out,
                    "Invalid date. Please use the format YYYY-MM-DD."
                )?,
            }
        }
    }

    fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        for _ in 0..self.max_attempts {
            match self.ask(question)?.to_lowercase().as_str() {
                "yes" => return Ok(true),
                "no" => return Ok(false),
                _ => writeln!(self.out, "Invalid input. Please enter 'yes' or 'no'.")?,
            }
        }
        Err(Error::InvalidInput(format!(
            "no yes/no answer after {} attempts",
            self.max_attempts
        )))
    }

    fn read_project_fields(&mut self) -> Result<ProjectFields> {
        Ok(ProjectFields {
            name: self.ask("Project Name")?,
            building_type: self.ask("Building Type")?,
            physical_address: self.ask("Physical Address")?,
            erf_num: self.read_number("ERF Number")?,
            total_fee: self.read_number("Total Fee")?,
            total_paid: self.read_number("Total Paid")?,
            deadline: self.read_date("Project Deadline (YYYY-MM-DD)")?,
        })
    }

    fn read_party_details(&mut self) -> Result<PartyDetails> {
        Ok(PartyDetails {
            name: self.ask("Name")?,
            cell_number: self.ask("Cell Number")?,
            email: self.ask("Email")?,
            address: self.ask("Address")?,
        })
    }
}
