use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::employee::{Employee, DATE_FORMAT};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub const CSV_HEADER: [&str; 15] = [
    "Employee ID",
    "First Name",
    "Surname",
    "Other Name",
    "Email",
    "Contact Number",
    "Department",
    "Role",
    "Gender",
    "Date of Birth",
    "Address",
    "State",
    "LGA",
    "Ward",
    "Date Created",
];

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("employees_{}.csv", now.format("%Y%m%d_%H%M"))
}

fn csv_error(err: impl std::fmt::Display) -> AppError {
    log::error!("CSV export failed: {}", err);
    AppError::InternalServerError("Failed to export employees".to_string())
}

/// Renders `records` in the given order under the fixed header.
pub fn export_csv(records: &[Employee]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;

    for employee in records {
        let date_of_birth = employee.date_of_birth.format(DATE_FORMAT).to_string();
        let created_at = employee.created_at.format(TIMESTAMP_FORMAT).to_string();
        writer
            .write_record([
                employee.employee_id.as_str(),
                employee.first_name.as_str(),
                employee.surname.as_str(),
                employee.other_name.as_deref().unwrap_or(""),
                employee.email.as_str(),
                employee.contact_number.as_str(),
                employee.department.as_str(),
                employee.role.as_str(),
                employee.gender.as_str(),
                date_of_birth.as_str(),
                employee.address.as_str(),
                employee.state.as_str(),
                employee.lga.as_str(),
                employee.ward.as_str(),
                created_at.as_str(),
            ])
            .map_err(csv_error)?;
    }

    writer.into_inner().map_err(csv_error)
}
