use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Chemical Engineering")]
    Chemical,
    #[serde(rename = "Civil Engineering")]
    Civil,
    #[serde(rename = "Computer Engineering")]
    Computer,
    #[serde(rename = "Electrical Engineering")]
    Electrical,
    #[serde(rename = "Electronics Engineering")]
    Electronics,
    #[serde(rename = "Material Engineering")]
    Material,
    #[serde(rename = "Mechanical Engineering")]
    Mechanical,
    #[serde(rename = "Mining Engineering")]
    Mining,
    #[serde(rename = "Textile Engineering")]
    Textile,
    #[serde(rename = "Biomedical Engineering")]
    Biomedical,
    #[serde(rename = "Industrial Engineering")]
    Industrial,
    #[serde(rename = "Environmental Engineering")]
    Environmental,
    #[serde(rename = "Aerospace Engineering")]
    Aerospace,
    #[serde(rename = "Software Engineering")]
    Software,
    #[serde(rename = "Data Science")]
    DataScience,
    #[serde(rename = "Artificial Intelligence")]
    ArtificialIntelligence,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Chemical,
        Field::Civil,
        Field::Computer,
        Field::Electrical,
        Field::Electronics,
        Field::Material,
        Field::Mechanical,
        Field::Mining,
        Field::Textile,
        Field::Biomedical,
        Field::Industrial,
        Field::Environmental,
        Field::Aerospace,
        Field::Software,
        Field::DataScience,
        Field::ArtificialIntelligence,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Chemical => "Chemical Engineering",
            Field::Civil => "Civil Engineering",
            Field::Computer => "Computer Engineering",
            Field::Electrical => "Electrical Engineering",
            Field::Electronics => "Electronics Engineering",
            Field::Material => "Material Engineering",
            Field::Mechanical => "Mechanical Engineering",
            Field::Mining => "Mining Engineering",
            Field::Textile => "Textile Engineering",
            Field::Biomedical => "Biomedical Engineering",
            Field::Industrial => "Industrial Engineering",
            Field::Environmental => "Environmental Engineering",
            Field::Aerospace => "Aerospace Engineering",
            Field::Software => "Software Engineering",
            Field::DataScience => "Data Science",
            Field::ArtificialIntelligence => "Artificial Intelligence",
        }
    }

    /// Fragment expected in the name of the workbook sheet holding this field.
    pub fn sheet_fragment(self) -> &'static str {
        match self {
            Field::DataScience => "Data",
            Field::ArtificialIntelligence => "AI",
            other => other
                .label()
                .split_whitespace()
                .next()
                .unwrap_or_else(|| other.label()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Field::ALL
            .into_iter()
            .find(|field| {
                field.label().eq_ignore_ascii_case(wanted)
                    || field.sheet_fragment().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unknown field '{wanted}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneConfirmation {
    Yes,
    No,
}

impl fmt::Display for PhoneConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhoneConfirmation::Yes => "Yes",
            PhoneConfirmation::No => "No",
        })
    }
}

impl FromStr for PhoneConfirmation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(PhoneConfirmation::Yes),
            "no" => Ok(PhoneConfirmation::No),
            other => Err(format!("unknown phone confirmation '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attendance {
    Present,
    Absent,
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attendance::Present => "Present",
            Attendance::Absent => "Absent",
        })
    }
}

impl FromStr for Attendance {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Attendance::Present),
            "absent" => Ok(Attendance::Absent),
            other => Err(format!("unknown attendance '{other}'")),
        }
    }
}

/// One alumnus as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub calling_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub whatsapp_mobile: String,
    #[serde(default)]
    pub mobile: Option<String>,
    pub field: Field,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub working_place: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone_confirmation: Option<PhoneConfirmation>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub attendance: Option<Attendance>,
}

impl Record {
    /// Identifier used for updates: the document id when the backend supplies one.
    pub fn key(&self) -> String {
        match self.document_id.as_deref() {
            Some(document_id) if !document_id.is_empty() => document_id.to_string(),
            _ => self.id.to_string(),
        }
    }

    pub fn country_label(&self) -> Option<&str> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|country| !country.is_empty())
    }
}

/// Payload for creating a record. Optional members are omitted when unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub calling_name: String,
    pub full_name: String,
    pub whatsapp_mobile: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub field: Field,
}

/// Partial update; only the populated members are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calling_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_confirmation: Option<PhoneConfirmation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == RecordPatch::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Unrestricted,
    Field(Field),
}

impl Scope {
    pub fn permits(&self, record: &Record) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::Field(field) => record.field == *field,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::Unrestricted => "all fields".to_string(),
            Scope::Field(field) => field.label().to_string(),
        }
    }
}

/// Tri-state constraint on one of the status enumerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<T> {
    Any,
    Unset,
    Is(T),
}

impl<T> Default for StatusFilter<T> {
    fn default() -> Self {
        StatusFilter::Any
    }
}

impl<T: PartialEq + Copy> StatusFilter<T> {
    pub fn matches(&self, value: Option<T>) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Unset => value.is_none(),
            StatusFilter::Is(wanted) => value == Some(*wanted),
        }
    }
}

impl<T> FromStr for StatusFilter<T>
where
    T: FromStr<Err = String>,
{
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::Any),
            "unset" | "none" | "not-marked" => Ok(StatusFilter::Unset),
            other => other.parse().map(StatusFilter::Is),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub term: Option<String>,
    pub field: Option<Field>,
    pub country: Option<String>,
    pub phone_confirmation: StatusFilter<PhoneConfirmation>,
    pub attendance: StatusFilter<Attendance>,
    pub working_place: Option<String>,
    pub nick_name: Option<String>,
    pub calling_name: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

impl Bucket {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
pub(crate) fn sample_record(id: i64, full_name: &str, field: Field) -> Record {
    Record {
        id,
        document_id: None,
        calling_name: full_name
            .split_whitespace()
            .next()
            .unwrap_or(full_name)
            .to_string(),
        full_name: full_name.to_string(),
        nick_name: None,
        email: format!("{}@example.com", full_name.to_lowercase().replace(' ', ".")),
        whatsapp_mobile: "+94770000000".to_string(),
        mobile: None,
        field,
        country: Some("Sri Lanka".to_string()),
        address: None,
        working_place: None,
        phone_confirmation: None,
        attendance: None,
    }
}
