use serde::Serialize;

/// Field of a greenest-window record a per-day sensor exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowField {
    WindowStartAms,
    WindowEndAms,
    GreenPercentage,
}

impl WindowField {
    pub const ALL: [WindowField; 3] = [
        WindowField::WindowStartAms,
        WindowField::WindowEndAms,
        WindowField::GreenPercentage,
    ];

    /// Wire name of the field, also used in entity names and ids
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WindowStartAms => "windowStartAms",
            Self::WindowEndAms => "windowEndAms",
            Self::GreenPercentage => "greenPercentage",
        }
    }
}

/// Every sensor the platform can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// One field of the greenest window at snapshot index `day`
    GreenestWindow { field: WindowField, day: usize },
    /// Start of the first window as `HH:MM`
    WindowStartTime,
    /// End of the first window as `HH:MM`
    WindowEndTime,
    /// Whole minutes until the first window starts, never negative
    MinutesUntilNextWindow,
    /// Forecast series; the state itself is the first forecast timestamp
    Forecast,
}

impl SensorKind {
    pub fn name(&self) -> String {
        match self {
            Self::GreenestWindow { field, day } => {
                format!("Vandebron {} Day {}", field.as_str(), day)
            }
            Self::WindowStartTime => "Vandebron Green Window Start Time".to_string(),
            Self::WindowEndTime => "Vandebron Green Window End Time".to_string(),
            Self::MinutesUntilNextWindow => "Minutes Until Next Green Window".to_string(),
            Self::Forecast => "Vandebron Forecast".to_string(),
        }
    }

    pub fn unique_id(&self) -> String {
        match self {
            Self::GreenestWindow { field, day } => {
                format!("vandebron_{}_{}", field.as_str(), day)
            }
            Self::WindowStartTime => "vandebron_green_window_start_time".to_string(),
            Self::WindowEndTime => "vandebron_green_window_end_time".to_string(),
            Self::MinutesUntilNextWindow => "vandebron_minutesuntilnextwindow".to_string(),
            Self::Forecast => "vandebron_forecast".to_string(),
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::GreenestWindow {
                field: WindowField::GreenPercentage,
                ..
            } => Some("%"),
            Self::MinutesUntilNextWindow => Some("min"),
            _ => None,
        }
    }
}

/// Rendered sensor value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    Text(String),
    Integer(i64),
}

/// Extra attributes of the forecast sensor: four parallel series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForecastAttributes {
    pub timestamps: Vec<String>,
    pub solar_percentages: Vec<i64>,
    pub wind_percentages: Vec<i64>,
    pub green_percentages: Vec<i64>,
}

/// Value plus optional attributes of one sensor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensorState {
    pub value: Option<StateValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<ForecastAttributes>,
}

impl SensorState {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn text(value: Option<String>) -> Self {
        Self {
            value: value.map(StateValue::Text),
            attributes: None,
        }
    }

    pub fn integer(value: Option<i64>) -> Self {
        Self {
            value: value.map(StateValue::Integer),
            attributes: None,
        }
    }
}

/// Registered sensor: what it shows and how it is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEntity {
    pub kind: SensorKind,
    pub name: String,
    pub unique_id: String,
    pub unit: Option<&'static str>,
}

impl SensorEntity {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            name: kind.name(),
            unique_id: kind.unique_id(),
            unit: kind.unit(),
        }
    }
}

/// Entity plus its current state, as served to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReading {
    pub unique_id: String,
    pub name: String,
    pub unit: Option<&'static str>,
    pub state: Option<StateValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<ForecastAttributes>,
}

impl SensorReading {
    pub fn new(entity: &SensorEntity, state: SensorState) -> Self {
        Self {
            unique_id: entity.unique_id.clone(),
            name: entity.name.clone(),
            unit: entity.unit,
            state: state.value,
            attributes: state.attributes,
        }
    }
}
