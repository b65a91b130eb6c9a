use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::utils::validation::first_invalid_field;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown gender '{0}'")]
pub struct ParseGenderError(String);

impl FromStr for Gender {
    type Err = ParseGenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("male") {
            Ok(Gender::Male)
        } else if s.eq_ignore_ascii_case("female") {
            Ok(Gender::Female)
        } else {
            Err(ParseGenderError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = ParseGenderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A stored employee profile.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub employee_id: String,
    pub first_name: String,
    pub surname: String,
    pub other_name: Option<String>,
    pub email: String,
    pub contact_number: String,
    pub date_of_birth: NaiveDate,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub address: String,
    pub state: String,
    pub lga: String,
    pub ward: String,
    pub department: String,
    pub role: String,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }

    /// Overwrites every editable field. `profile_picture` and `created_at`
    /// are left alone.
    pub fn apply(&mut self, draft: EmployeeDraft, updated_at: DateTime<Utc>) {
        self.employee_id = draft.employee_id;
        self.first_name = draft.first_name;
        self.surname = draft.surname;
        self.other_name = draft.other_name;
        self.email = draft.email;
        self.contact_number = draft.contact_number;
        self.date_of_birth = draft.date_of_birth;
        self.gender = draft.gender;
        self.address = draft.address;
        self.state = draft.state;
        self.lga = draft.lga;
        self.ward = draft.ward;
        self.department = draft.department;
        self.role = draft.role;
        self.updated_at = updated_at;
    }
}

/// The validated, typed set of editable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeDraft {
    pub employee_id: String,
    pub first_name: String,
    pub surname: String,
    pub other_name: Option<String>,
    pub email: String,
    pub contact_number: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub state: String,
    pub lga: String,
    pub ward: String,
    pub department: String,
    pub role: String,
}

impl EmployeeDraft {
    pub fn into_employee(
        self,
        id: i64,
        profile_picture: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Employee {
        Employee {
            id,
            employee_id: self.employee_id,
            first_name: self.first_name,
            surname: self.surname,
            other_name: self.other_name,
            email: self.email,
            contact_number: self.contact_number,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            address: self.address,
            state: self.state,
            lga: self.lga,
            ward: self.ward,
            department: self.department,
            role: self.role,
            profile_picture,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Order in which required fields are checked and reported.
pub const FIELD_ORDER: [&str; 14] = [
    "first_name",
    "surname",
    "employee_id",
    "email",
    "contact_number",
    "date_of_birth",
    "gender",
    "address",
    "state",
    "lga",
    "ward",
    "department",
    "role",
    "other_name",
];

/// Raw onboarding/edit form values as submitted. Accepts the legacy form
/// field names as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EmployeeForm {
    #[serde(alias = "firstname")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub surname: String,
    #[serde(alias = "othername")]
    #[validate(length(max = 100))]
    pub other_name: Option<String>,
    #[serde(alias = "employeeid")]
    #[validate(length(min = 1, max = 50))]
    pub employee_id: String,
    #[validate(length(min = 1, max = 254), email)]
    pub email: String,
    #[serde(alias = "contactnumber")]
    #[validate(length(min = 1, max = 20))]
    pub contact_number: String,
    #[serde(alias = "dob")]
    #[validate(custom = "validate_date_of_birth")]
    pub date_of_birth: String,
    #[validate(custom = "validate_gender")]
    pub gender: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 100))]
    pub lga: String,
    #[validate(length(min = 1, max = 100))]
    pub ward: String,
    #[validate(length(min = 1, max = 100))]
    pub department: String,
    #[validate(length(min = 1, max = 100))]
    pub role: String,
}

fn validate_date_of_birth(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| {
            let mut err = ValidationError::new("date");
            err.message = Some("Enter a valid date (YYYY-MM-DD).".into());
            err
        })
}

fn validate_gender(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    value.parse::<Gender>().map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("gender");
        err.message = Some("Gender must be either 'Male' or 'Female'.".into());
        err
    })
}

fn label(field: &str) -> &'static str {
    match field {
        "first_name" => "First name",
        "surname" => "Surname",
        "other_name" => "Other name",
        "employee_id" => "Employee ID",
        "email" => "Email",
        "contact_number" => "Contact number",
        "date_of_birth" => "Date of birth",
        "gender" => "Gender",
        "address" => "Address",
        "state" => "State",
        "lga" => "LGA",
        "ward" => "Ward",
        "department" => "Department",
        "role" => "Role",
        _ => "Field",
    }
}

impl EmployeeForm {
    /// Reads a form from submitted name/value pairs the way an HTML form
    /// is read: scalars are taken as text, nulls as absent. Unknown names
    /// are ignored.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, AppError> {
        let mut text = Map::new();
        for (name, value) in fields {
            let value = match value {
                Value::Null => continue,
                Value::String(value) => value,
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(AppError::validation(
                        "form",
                        format!("Field '{}' must be a single value.", name),
                    ))
                }
            };
            text.insert(name, Value::String(value));
        }

        serde_json::from_value(Value::Object(text))
            .map_err(|err| AppError::validation("form", format!("Malformed form submission: {}", err)))
    }

    /// Strips surrounding whitespace from every value; a blank other name
    /// becomes absent.
    pub fn trimmed(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            other_name: self
                .other_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            employee_id: self.employee_id.trim().to_string(),
            email: self.email.trim().to_string(),
            contact_number: self.contact_number.trim().to_string(),
            date_of_birth: self.date_of_birth.trim().to_string(),
            gender: self.gender.trim().to_string(),
            address: self.address.trim().to_string(),
            state: self.state.trim().to_string(),
            lga: self.lga.trim().to_string(),
            ward: self.ward.trim().to_string(),
            department: self.department.trim().to_string(),
            role: self.role.trim().to_string(),
        }
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "first_name" => &self.first_name,
            "surname" => &self.surname,
            "other_name" => self.other_name.as_deref().unwrap_or_default(),
            "employee_id" => &self.employee_id,
            "email" => &self.email,
            "contact_number" => &self.contact_number,
            "date_of_birth" => &self.date_of_birth,
            "gender" => &self.gender,
            "address" => &self.address,
            "state" => &self.state,
            "lga" => &self.lga,
            "ward" => &self.ward,
            "department" => &self.department,
            "role" => &self.role,
            _ => "",
        }
    }

    /// Validates the form and converts it into typed editable fields. The
    /// first failing field, in [`FIELD_ORDER`], is reported.
    pub fn to_draft(&self) -> Result<EmployeeDraft, AppError> {
        let form = self.clone().trimmed();

        if let Err((field, err)) = first_invalid_field(&form, &FIELD_ORDER) {
            let name = label(field);
            let message = if form.value(field).is_empty() {
                format!("{} is required.", name)
            } else if let Some(message) = err.message {
                message.to_string()
            } else if err.code == "email" {
                "Enter a valid email address.".to_string()
            } else if let Some(max) = err.params.get("max").and_then(|max| max.as_u64()) {
                format!("{} must be at most {} characters.", name, max)
            } else {
                format!("{} is invalid.", name)
            };
            return Err(AppError::validation(field, message));
        }

        let date_of_birth = NaiveDate::parse_from_str(&form.date_of_birth, DATE_FORMAT)
            .map_err(|_| AppError::validation("date_of_birth", "Enter a valid date (YYYY-MM-DD)."))?;
        let gender = form
            .gender
            .parse::<Gender>()
            .map_err(|err| AppError::validation("gender", err.to_string()))?;

        Ok(EmployeeDraft {
            employee_id: form.employee_id,
            first_name: form.first_name,
            surname: form.surname,
            other_name: form.other_name,
            email: form.email,
            contact_number: form.contact_number,
            date_of_birth,
            gender,
            address: form.address,
            state: form.state,
            lga: form.lga,
            ward: form.ward,
            department: form.department,
            role: form.role,
        })
    }
}

impl From<&Employee> for EmployeeForm {
    fn from(employee: &Employee) -> Self {
        Self {
            first_name: employee.first_name.clone(),
            surname: employee.surname.clone(),
            other_name: employee.other_name.clone(),
            employee_id: employee.employee_id.clone(),
            email: employee.email.clone(),
            contact_number: employee.contact_number.clone(),
            date_of_birth: employee.date_of_birth.format(DATE_FORMAT).to_string(),
            gender: employee.gender.to_string(),
            address: employee.address.clone(),
            state: employee.state.clone(),
            lga: employee.lga.clone(),
            ward: employee.ward.clone(),
            department: employee.department.clone(),
            role: employee.role.clone(),
        }
    }
}
