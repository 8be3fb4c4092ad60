//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use carehero_domain::{AppointmentSummary, BookingMethod};
use carehero_orchestrator::{Responder, SessionStatus, TurnResponse};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format one assistant reply.
    pub fn format_turn(&self, turn: &TurnResponse) -> Result<String> {
        if let OutputFormat::Json = self.format {
            return Ok(serde_json::to_string_pretty(turn)?);
        }

        let (label, color) = match turn.responder {
            Responder::Intake => ("intake", "cyan"),
            Responder::Reasoning => ("reasoning", "magenta"),
            Responder::Guardrail => ("safety", "yellow"),
        };
        let mut out = format!("{} {}", self.colorize(&format!("[{}]", label), color), turn.response);
        if let Some(warning) = &turn.warning {
            out.push('\n');
            out.push_str(&self.warning(warning));
        }
        if turn.discovery_started {
            out.push('\n');
            out.push_str(&self.info(
                "Searching for nearby institutions in the background. Type 'results' to see them.",
            ));
        }
        Ok(out)
    }

    /// Format session progress.
    pub fn format_status(&self, status: &SessionStatus) -> Result<String> {
        if let OutputFormat::Json = self.format {
            return Ok(serde_json::to_string_pretty(status)?);
        }

        let not_set = || "-".to_string();
        let collected = &status.collected;
        let symptoms = if status.symptoms.is_empty() {
            not_set()
        } else {
            status.symptoms.join(", ")
        };

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        builder.push_record(["Session".to_string(), status.session_id.clone()]);
        builder.push_record(["State".to_string(), format!("{:?}", status.state)]);
        builder.push_record([
            "Condition".to_string(),
            collected.medical_condition.clone().unwrap_or_else(not_set),
        ]);
        builder.push_record(["ZIP code".to_string(), collected.zip_code.clone().unwrap_or_else(not_set)]);
        builder.push_record(["Phone".to_string(), collected.phone_number.clone().unwrap_or_else(not_set)]);
        builder.push_record(["Insurance".to_string(), collected.insurance.clone().unwrap_or_else(not_set)]);
        builder.push_record(["Symptoms".to_string(), symptoms]);
        builder.push_record([
            "Next question".to_string(),
            status.next_field.map(|f| f.label().to_string()).unwrap_or_else(not_set),
        ]);
        builder.push_record(["Messages".to_string(), status.conversation_turns.to_string()]);
        builder.push_record(["Discovery".to_string(), format!("{:?}", status.discovery)]);

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        Ok(table.to_string())
    }

    /// Format appointment summaries.
    pub fn format_summaries(&self, summaries: &[AppointmentSummary]) -> Result<String> {
        if let OutputFormat::Json = self.format {
            return Ok(serde_json::to_string_pretty(summaries)?);
        }

        if summaries.is_empty() {
            return Ok(self.colorize("No institutions found.", "yellow"));
        }

        let mut builder = Builder::default();
        builder.push_record(["Institution", "Next available", "Slots", "Booking", "Notes"]);

        for summary in summaries {
            let booking = match summary.booking_method {
                BookingMethod::Online => "online",
                BookingMethod::VisitWebsite => "visit website",
            };
            let notes = summary
                .processing_error
                .as_deref()
                .or(summary.booking_note.as_deref())
                .unwrap_or("");
            builder.push_record([
                summary.institution_name.as_str(),
                summary.next_available.as_deref().unwrap_or("-"),
                &summary.total_slots_found.to_string(),
                booking,
                notes,
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        Ok(table.to_string())
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehero_domain::{PartialFields, RequiredField};
    use carehero_orchestrator::{ConversationState, DiscoveryState, TurnPhase};

    fn summary(error: Option<&str>) -> AppointmentSummary {
        AppointmentSummary {
            institution_name: "Mission Family Clinic".to_string(),
            url: "https://mission-clinic.org".to_string(),
            available_slots: vec!["9:15 AM".to_string()],
            booking_method: BookingMethod::Online,
            next_available: Some("9:15 AM".to_string()),
            total_slots_found: 1,
            booking_note: None,
            processing_error: error.map(str::to_string),
        }
    }

    fn turn(responder: Responder, warning: Option<&str>) -> TurnResponse {
        TurnResponse {
            session_id: "s".to_string(),
            response: "What is your ZIP code?".to_string(),
            responder,
            phase: TurnPhase::ContinueCollecting,
            warning: warning.map(str::to_string),
            collected: PartialFields::default(),
            missing_fields: RequiredField::PRIORITY.to_vec(),
            discovery_started: false,
        }
    }

    #[test]
    fn test_turn_plain() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let out = formatter.format_turn(&turn(Responder::Intake, None)).unwrap();
        assert_eq!(out, "[intake] What is your ZIP code?");
    }

    #[test]
    fn test_turn_with_warning() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let out = formatter
            .format_turn(&turn(Responder::Guardrail, Some("needs a disclaimer")))
            .unwrap();
        assert!(out.starts_with("[safety]"));
        assert!(out.ends_with("⚠ needs a disclaimer"));
    }

    #[test]
    fn test_turn_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let out = formatter.format_turn(&turn(Responder::Intake, None)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["session_id"], "s");
    }

    #[test]
    fn test_summary_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let out = formatter
            .format_summaries(&[summary(None), summary(Some("timed out"))])
            .unwrap();
        assert!(out.contains("Next available"));
        assert!(out.contains("Mission Family Clinic"));
        assert!(out.contains("timed out"));
    }

    #[test]
    fn test_empty_summaries() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_summaries(&[]).unwrap();
        assert!(output.contains("No institutions found"));
    }

    #[test]
    fn test_status_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let status = SessionStatus {
            session_id: "s".to_string(),
            state: ConversationState::Collecting,
            collected: PartialFields {
                zip_code: Some("94110".to_string()),
                ..Default::default()
            },
            missing_fields: vec![RequiredField::MedicalCondition],
            next_field: Some(RequiredField::MedicalCondition),
            symptoms: Vec::new(),
            conversation_turns: 2,
            discovery: DiscoveryState::NotStarted,
        };
        let out = formatter.format_status(&status).unwrap();
        assert!(out.contains("94110"));
        assert!(out.contains("medical condition"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }
}
