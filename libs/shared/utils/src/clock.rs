//! Consultation, appointment and movement times are stored as clinic-local
//! wall-clock values; audit columns stay in UTC.

use chrono::{Local, NaiveDate, NaiveDateTime};

pub fn clinic_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn clinic_today() -> NaiveDate {
    clinic_now().date()
}
