//! Setup flow
//!
//! Two-step form protocol that produces the data of a config entry. Step
//! `user` picks a setup mode; the advanced mode adds step `options`, which
//! collects `day_offset`. Each step either returns a form to (re)display or
//! the entry to create. The flow is stateless: every submission names its
//! step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coordinator::{MAX_DAY_OFFSET, MIN_DAY_OFFSET};

pub const ENTRY_TITLE: &str = "Vandebron Green Energy";
pub const DEFAULT_DAY_OFFSET: u8 = 1;

const FIELD_SETUP_MODE: &str = "setup_mode";
const FIELD_DAY_OFFSET: &str = "day_offset";

/// Raw submitted form values
pub type FlowInput = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupMode {
    Default,
    Advanced,
}

impl SetupMode {
    fn from_value(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Self::Default),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Data stored in a config entry: exactly what the flow collected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_mode: Option<SetupMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_offset: Option<u8>,
}

impl EntryData {
    /// Effective number of days, defaulting to one
    pub fn day_offset(&self) -> u8 {
        self.day_offset.unwrap_or(DEFAULT_DAY_OFFSET)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    User,
    Options,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Select { options: Vec<SelectOption> },
    Integer { min: i64, max: i64 },
}

/// One field of a form schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub required: bool,
    pub default: Value,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Outcome of a flow step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowResult {
    Form {
        step_id: StepId,
        schema: Vec<FormField>,
        errors: BTreeMap<String, String>,
        description_placeholders: BTreeMap<String, String>,
    },
    CreateEntry {
        title: String,
        data: EntryData,
    },
}

impl FlowResult {
    pub fn is_form(&self) -> bool {
        matches!(self, FlowResult::Form { .. })
    }

    /// Entry data when this result creates an entry
    pub fn entry_data(&self) -> Option<&EntryData> {
        match self {
            FlowResult::CreateEntry { data, .. } => Some(data),
            FlowResult::Form { .. } => None,
        }
    }

    /// Field errors when this result is a form
    pub fn errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            FlowResult::Form { errors, .. } => Some(errors),
            FlowResult::CreateEntry { .. } => None,
        }
    }
}

/// The setup flow
#[derive(Debug, Default, Clone, Copy)]
pub struct SetupFlow;

impl SetupFlow {
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self
    }

    /// First step: choose default or advanced setup
    pub fn step_user(&self, input: Option<&FlowInput>) -> FlowResult {
        let Some(input) = input else {
            return user_form(BTreeMap::new());
        };

        let mode = match input.get(FIELD_SETUP_MODE) {
            None | Some(Value::Null) => Err("required"),
            Some(Value::String(s)) => SetupMode::from_value(s).ok_or("invalid_choice"),
            Some(_) => Err("invalid_choice"),
        };

        match mode {
            Ok(SetupMode::Advanced) => self.step_options(None),
            Ok(SetupMode::Default) => self.step_confirm(EntryData {
                setup_mode: Some(SetupMode::Default),
                day_offset: None,
            }),
            Err(code) => {
                let mut errors = BTreeMap::new();
                errors.insert(FIELD_SETUP_MODE.to_string(), code.to_string());
                user_form(errors)
            }
        }
    }

    /// Advanced step: number of days to fetch
    pub fn step_options(&self, input: Option<&FlowInput>) -> FlowResult {
        let Some(input) = input else {
            return options_form(BTreeMap::new());
        };

        match coerce_day_offset(input.get(FIELD_DAY_OFFSET)) {
            Ok(day_offset) => self.step_confirm(EntryData {
                setup_mode: None,
                day_offset: Some(day_offset),
            }),
            Err(code) => {
                let mut errors = BTreeMap::new();
                errors.insert(FIELD_DAY_OFFSET.to_string(), code.to_string());
                options_form(errors)
            }
        }
    }

    /// Final step: create the entry from whatever was collected
    pub fn step_confirm(&self, data: EntryData) -> FlowResult {
        FlowResult::CreateEntry {
            title: ENTRY_TITLE.to_string(),
            data,
        }
    }
}

fn user_form(errors: BTreeMap<String, String>) -> FlowResult {
    FlowResult::Form {
        step_id: StepId::User,
        schema: vec![FormField {
            name: FIELD_SETUP_MODE,
            required: true,
            default: Value::from("default"),
            kind: FieldKind::Select {
                options: vec![
                    SelectOption {
                        value: "default",
                        label: "Default Setup",
                    },
                    SelectOption {
                        value: "advanced",
                        label: "Advanced Setup",
                    },
                ],
            },
        }],
        errors,
        description_placeholders: BTreeMap::new(),
    }
}

fn options_form(errors: BTreeMap<String, String>) -> FlowResult {
    let mut placeholders = BTreeMap::new();
    placeholders.insert(
        "day_offset_label".to_string(),
        "Number of days to retrieve data for".to_string(),
    );
    FlowResult::Form {
        step_id: StepId::Options,
        schema: vec![FormField {
            name: FIELD_DAY_OFFSET,
            required: true,
            default: Value::from(DEFAULT_DAY_OFFSET),
            kind: FieldKind::Integer {
                min: i64::from(MIN_DAY_OFFSET),
                max: i64::from(MAX_DAY_OFFSET),
            },
        }],
        errors,
        description_placeholders: placeholders,
    }
}

/// Coerce a submitted value to a day offset, or name the error
fn coerce_day_offset(value: Option<&Value>) -> std::result::Result<u8, &'static str> {
    let number = match value {
        None | Some(Value::Null) => return Err("required"),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => f as i64,
            _ => return Err("not_an_integer"),
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| "not_an_integer")?,
        Some(_) => return Err("not_an_integer"),
    };

    if number < i64::from(MIN_DAY_OFFSET) || number > i64::from(MAX_DAY_OFFSET) {
        return Err("out_of_range");
    }
    u8::try_from(number).map_err(|_| "out_of_range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(v: Value) -> FlowInput {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn coerce_accepts_integers_and_numeric_strings() {
        assert_eq!(coerce_day_offset(Some(&json!(3))), Ok(3));
        assert_eq!(coerce_day_offset(Some(&json!("7"))), Ok(7));
        assert_eq!(coerce_day_offset(Some(&json!(2.0))), Ok(2));
    }

    #[test]
    fn coerce_requires_a_value() {
        assert_eq!(coerce_day_offset(None), Err("required"));
        assert_eq!(coerce_day_offset(Some(&Value::Null)), Err("required"));
    }

    #[test]
    fn coerce_rejects_fractions_and_garbage() {
        assert_eq!(coerce_day_offset(Some(&json!(2.5))), Err("not_an_integer"));
        assert_eq!(coerce_day_offset(Some(&json!("two"))), Err("not_an_integer"));
        assert_eq!(coerce_day_offset(Some(&json!(true))), Err("not_an_integer"));
        assert_eq!(coerce_day_offset(Some(&json!(0))), Err("out_of_range"));
        assert_eq!(coerce_day_offset(Some(&json!(-3))), Err("out_of_range"));
    }

    #[test]
    fn unknown_mode_redisplays_user_form() {
        let flow = SetupFlow::new();
        let res = flow.step_user(Some(&input(json!({"setup_mode": "expert"}))));
        assert_eq!(
            res.errors().and_then(|e| e.get("setup_mode")).map(String::as_str),
            Some("invalid_choice")
        );
    }

    #[test]
    fn entry_data_defaults_to_one_day() {
        assert_eq!(EntryData::default().day_offset(), 1);
        let data: EntryData = serde_json::from_value(json!({"setup_mode": "default"})).unwrap();
        assert_eq!(data.day_offset(), 1);
    }
}
