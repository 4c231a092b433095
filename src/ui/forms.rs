use chrono::{NaiveDate, NaiveDateTime};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::ClinicError;

/// Accepted spellings for an appointment timestamp, tried in order.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// What a field holds, which decides how it is parsed and drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
    DateTime,
    /// Pick list cycled with Left/Right; the value is the chosen id.
    Choice,
}

/// One entry of a pick list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Choice {
    pub(crate) id: i64,
    pub(crate) label: String,
}

#[derive(Clone, Debug)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) required: bool,
    pub(crate) value: String,
    pub(crate) choices: Vec<Choice>,
    pub(crate) choice_index: usize,
    /// Autocomplete candidates for text fields.
    pub(crate) suggestions: Vec<String>,
}

impl FormField {
    fn new(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            kind,
            required: false,
            value: String::new(),
            choices: Vec::new(),
            choice_index: 0,
            suggestions: Vec::new(),
        }
    }

    pub(crate) fn text(label: &'static str) -> Self {
        Self::new(label, FieldKind::Text)
    }

    pub(crate) fn integer(label: &'static str) -> Self {
        Self::new(label, FieldKind::Integer)
    }

    pub(crate) fn decimal(label: &'static str) -> Self {
        Self::new(label, FieldKind::Decimal)
    }

    pub(crate) fn date(label: &'static str) -> Self {
        Self::new(label, FieldKind::Date)
    }

    pub(crate) fn date_time(label: &'static str) -> Self {
        Self::new(label, FieldKind::DateTime)
    }

    pub(crate) fn choice(label: &'static str, choices: Vec<Choice>) -> Self {
        let mut field = Self::new(label, FieldKind::Choice);
        field.choices = choices;
        field.required = true;
        field
    }

    pub(crate) fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub(crate) fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    fn selected_choice(&self) -> Option<&Choice> {
        self.choices.get(self.choice_index)
    }

    fn placeholder(&self) -> &'static str {
        match (self.kind, self.required) {
            (FieldKind::Date, _) => "YYYY-MM-DD",
            (FieldKind::DateTime, _) => "YYYY-MM-DD HH:MM",
            (_, true) => "<required>",
            (_, false) => "<optional>",
        }
    }

    /// Text shown after the label, either the typed value or the pick.
    fn display_value(&self) -> String {
        match self.kind {
            FieldKind::Choice => match self.selected_choice() {
                Some(choice) => format!("◀ {} ▶", choice.label),
                None => "<nothing to choose>".to_string(),
            },
            _ => self.value.clone(),
        }
    }

    fn is_blank(&self) -> bool {
        match self.kind {
            FieldKind::Choice => self.choices.is_empty(),
            _ => self.value.trim().is_empty(),
        }
    }
}

/// A stack of labelled inputs with one focused field. Used both for the modal
/// add dialogs and for the filter bar above each grid.
#[derive(Clone, Debug, Default)]
pub(crate) struct Form {
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<String>,
    autocomplete_disabled: bool,
}

impl Form {
    pub(crate) fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    fn active_field(&self) -> Option<&FormField> {
        self.fields.get(self.active)
    }

    fn active_field_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.active)
    }

    /// Replace the completion candidates of field `index`.
    pub(crate) fn set_suggestions(&mut self, index: usize, suggestions: Vec<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.suggestions = suggestions;
        }
        self.update_suggestion();
    }

    /// Whether the focused field is a pick list.
    pub(crate) fn active_is_choice(&self) -> bool {
        self.active_field()
            .is_some_and(|field| field.kind == FieldKind::Choice)
    }

    /// Move focus forward, wrapping around.
    pub(crate) fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
        self.clear_suggestion();
    }

    /// Move focus backward, wrapping around.
    pub(crate) fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
        self.clear_suggestion();
    }

    /// Append a character to the focused text field. Numbers and dates are
    /// typed freely and only checked on submit.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        let Some(field) = self.active_field_mut() else {
            return false;
        };
        if field.kind == FieldKind::Choice {
            return false;
        }
        field.value.push(ch);
        self.autocomplete_disabled = false;
        self.update_suggestion();
        true
    }

    /// Remove the last character from the focused field.
    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.active_field_mut() {
            field.value.pop();
        }
        self.autocomplete_disabled = false;
        self.update_suggestion();
    }

    /// Step through the focused pick list.
    pub(crate) fn cycle_choice(&mut self, delta: isize) {
        let Some(field) = self.active_field_mut() else {
            return;
        };
        if field.kind != FieldKind::Choice || field.choices.is_empty() {
            return;
        }
        let len = field.choices.len() as isize;
        field.choice_index = (field.choice_index as isize + delta).rem_euclid(len) as usize;
    }

    /// Label of the first pick list that has nothing to offer.
    pub(crate) fn empty_choice(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|field| field.kind == FieldKind::Choice && field.choices.is_empty())
            .map(|field| field.label)
    }

    /// Case-insensitive prefix match against the focused field's candidates,
    /// once at least two characters are typed.
    pub(crate) fn update_suggestion(&mut self) {
        let Some(field) = self.active_field() else {
            self.suggestion = None;
            return;
        };
        if self.autocomplete_disabled
            || field.suggestions.is_empty()
            || field.value.chars().count() < 2
        {
            self.suggestion = None;
            return;
        }

        let current_lower = field.value.to_lowercase();
        self.suggestion = field
            .suggestions
            .iter()
            .find(|candidate| candidate.to_lowercase().starts_with(&current_lower))
            .filter(|candidate| candidate.to_lowercase() != current_lower)
            .cloned();
    }

    /// Replace the focused value with the suggestion. Returns false when
    /// nothing was pending.
    pub(crate) fn accept_suggestion(&mut self) -> bool {
        let Some(candidate) = self.suggestion.take() else {
            return false;
        };
        if let Some(field) = self.active_field_mut() {
            field.value = candidate;
        }
        self.autocomplete_disabled = true;
        true
    }

    /// Explicitly disable autocomplete for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.suggestion.is_some() {
            self.autocomplete_disabled = true;
            self.suggestion = None;
            return true;
        }
        false
    }

    fn clear_suggestion(&mut self) {
        self.suggestion = None;
    }

    /// Remaining characters of the suggestion, shown ghosted after the input.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        let candidate = self.suggestion.as_ref()?;
        let current_len = self.active_field()?.value.chars().count();
        let suffix: String = candidate.chars().skip(current_len).collect();
        if suffix.is_empty() {
            None
        } else {
            Some(suffix)
        }
    }

    /// Render field `index` as `Label: value`, highlighting focus when the
    /// form itself has focus.
    pub(crate) fn build_line(&self, index: usize, focused: bool) -> Line<'static> {
        let field = &self.fields[index];
        let is_active = focused && index == self.active;
        let value = field.display_value();

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if field.is_blank() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let mut spans = vec![Span::raw(format!("{}: ", field.label))];
        if value.is_empty() {
            if !is_active {
                spans.push(Span::styled(field.placeholder(), style));
            }
        } else {
            spans.push(Span::styled(value, style));
        }
        if is_active {
            if let Some(suffix) = self.suggestion_suffix() {
                spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
            }
        }
        Line::from(spans)
    }

    /// Column of the cursor within the focused line, or None for pick lists.
    pub(crate) fn cursor_offset(&self) -> Option<u16> {
        let field = self.active_field()?;
        if field.kind == FieldKind::Choice {
            return None;
        }
        Some((field.label.chars().count() + 2 + field.value.chars().count()) as u16)
    }

    fn field(&self, index: usize) -> Result<&FormField, ClinicError> {
        self.fields
            .get(index)
            .ok_or_else(|| ClinicError::validation(format!("Unknown form field {index}.")))
    }

    /// Trimmed text; blank is an error only for required fields.
    pub(crate) fn text(&self, index: usize) -> Result<String, ClinicError> {
        let field = self.field(index)?;
        let value = field.value.trim();
        if value.is_empty() && field.required {
            return Err(ClinicError::validation(format!("{} is required.", field.label)));
        }
        Ok(value.to_string())
    }

    /// Trimmed text, or None when blank.
    pub(crate) fn optional_text(&self, index: usize) -> Result<Option<String>, ClinicError> {
        let value = self.text(index)?;
        Ok((!value.is_empty()).then_some(value))
    }

    pub(crate) fn integer(&self, index: usize) -> Result<Option<i64>, ClinicError> {
        self.parse_with(index, "a whole number", |raw| raw.parse::<i64>().ok())
    }

    pub(crate) fn decimal(&self, index: usize) -> Result<Option<f64>, ClinicError> {
        self.parse_with(index, "a number", |raw| {
            raw.parse::<f64>().ok().filter(|value| value.is_finite())
        })
    }

    pub(crate) fn date(&self, index: usize) -> Result<Option<NaiveDate>, ClinicError> {
        self.parse_with(index, "a date (YYYY-MM-DD)", |raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
        })
    }

    pub(crate) fn date_time(&self, index: usize) -> Result<Option<NaiveDateTime>, ClinicError> {
        self.parse_with(index, "a date and time (YYYY-MM-DD HH:MM)", parse_date_time)
    }

    /// Id of the current pick.
    pub(crate) fn choice(&self, index: usize) -> Result<i64, ClinicError> {
        let field = self.field(index)?;
        field
            .selected_choice()
            .map(|choice| choice.id)
            .ok_or_else(|| ClinicError::validation(format!("Choose a {}.", field.label)))
    }

    /// Same as the optional accessors but blank is always an error.
    pub(crate) fn require<T>(
        &self,
        index: usize,
        parsed: Result<Option<T>, ClinicError>,
    ) -> Result<T, ClinicError> {
        parsed?.ok_or_else(|| {
            let label = self.fields.get(index).map_or("Field", |field| field.label);
            ClinicError::validation(format!("{label} is required."))
        })
    }

    fn parse_with<T>(
        &self,
        index: usize,
        expected: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ClinicError> {
        let Some(raw) = self.optional_text(index)? else {
            return Ok(None);
        };
        let field = self.field(index)?;
        parse(&raw).map(Some).ok_or_else(|| {
            ClinicError::validation(format!("{} must be {expected}, got \"{raw}\".", field.label))
        })
    }
}

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(form: &mut Form, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn required_text_is_enforced() {
        let form = Form::new(vec![FormField::text("First name").required()]);
        let err = form.text(0).unwrap_err();
        assert_eq!(err.to_string(), "First name is required.");
    }

    #[test]
    fn numbers_are_validated_on_parse() {
        let mut form = Form::new(vec![FormField::integer("Age").required()]);
        typed(&mut form, "4x");
        let err = form.integer(0).unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        assert!(err.to_string().starts_with("Age must be a whole number"));

        form.backspace();
        assert_eq!(form.integer(0).unwrap(), Some(4));
    }

    #[test]
    fn blank_optional_numbers_are_none() {
        let form = Form::new(vec![FormField::decimal("Rating")]);
        assert_eq!(form.decimal(0).unwrap(), None);
    }

    #[test]
    fn require_rejects_blank() {
        let form = Form::new(vec![FormField::integer("Experience").required()]);
        let err = form.require(0, form.integer(0)).unwrap_err();
        assert_eq!(err.to_string(), "Experience is required.");
    }

    #[test]
    fn date_time_accepts_several_spellings() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        for raw in ["2024-05-01 09:30", "2024-05-01T09:30", "2024-05-01 09:30:00"] {
            assert_eq!(parse_date_time(raw), Some(expected), "{raw}");
        }
        assert_eq!(
            parse_date_time("2024-05-01"),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_date_time("May 1st"), None);
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut form = Form::new(vec![
            FormField::text("A"),
            FormField::text("B"),
            FormField::text("C"),
        ]);
        form.previous_field();
        assert_eq!(form.active, 2);
        form.next_field();
        assert_eq!(form.active, 0);
    }

    #[test]
    fn choices_cycle_and_resolve_ids() {
        let mut form = Form::new(vec![FormField::choice(
            "Doctor",
            vec![
                Choice { id: 7, label: "Gregory House".into() },
                Choice { id: 9, label: "Meredith Grey".into() },
            ],
        )]);
        assert!(!form.push_char('x'));
        assert_eq!(form.choice(0).unwrap(), 7);
        form.cycle_choice(1);
        assert_eq!(form.choice(0).unwrap(), 9);
        form.cycle_choice(1);
        assert_eq!(form.choice(0).unwrap(), 7);
        form.cycle_choice(-1);
        assert_eq!(form.choice(0).unwrap(), 9);
    }

    #[test]
    fn empty_choice_is_reported() {
        let form = Form::new(vec![
            FormField::choice("Doctor", vec![Choice { id: 1, label: "A".into() }]),
            FormField::choice("Client", Vec::new()),
        ]);
        assert_eq!(form.empty_choice(), Some("Client"));
        assert!(form.choice(1).is_err());
    }

    #[test]
    fn suggestion_completes_case_insensitively() {
        let mut form = Form::new(vec![FormField::text("Specialization")
            .with_suggestions(vec!["Cardiology".into(), "Neurology".into()])]);
        typed(&mut form, "c");
        assert_eq!(form.suggestion, None);
        typed(&mut form, "a");
        assert_eq!(form.suggestion.as_deref(), Some("Cardiology"));
        assert_eq!(form.suggestion_suffix().as_deref(), Some("rdiology"));

        assert!(form.accept_suggestion());
        assert_eq!(form.fields[0].value, "Cardiology");
        assert!(!form.accept_suggestion());
    }

    #[test]
    fn cancelled_autocomplete_stays_quiet_until_typing() {
        let mut form = Form::new(vec![
            FormField::text("Specialization").with_suggestions(vec!["Cardiology".into()])
        ]);
        typed(&mut form, "Ca");
        assert!(form.cancel_autocomplete());
        assert_eq!(form.suggestion, None);
        typed(&mut form, "r");
        assert_eq!(form.suggestion.as_deref(), Some("Cardiology"));
    }

    #[test]
    fn cursor_follows_label_and_value() {
        let mut form = Form::new(vec![FormField::text("Name")]);
        typed(&mut form, "Ann");
        assert_eq!(form.cursor_offset(), Some(("Name: ".len() + 3) as u16));
    }
}
