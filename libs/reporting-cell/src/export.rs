//! Spreadsheet renditions of the revenue report and the statistics overview.

use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use crate::models::{RevenueReport, Statistics};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SECTION_FILL: Color = Color::RGB(0xD3D3D3);
const HEADER_FILL: Color = Color::RGB(0xADD8E6);
const MONEY_FORMAT: &str = "#,##0.00 \"DH\"";

pub fn revenue_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "Rapport_Revenus_{}_{}.xlsx",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

pub fn statistics_file_name(today: NaiveDate) -> String {
    format!("Statistiques_Cabinet_{}.xlsx", today.format("%Y%m%d"))
}

struct Styles {
    title: Format,
    section: Format,
    header: Format,
    money: Format,
    alert: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(16),
            section: Format::new().set_bold().set_background_color(SECTION_FILL),
            header: Format::new().set_bold().set_background_color(HEADER_FILL),
            money: Format::new().set_num_format(MONEY_FORMAT),
            alert: Format::new().set_font_color(Color::Red),
        }
    }
}

fn header_row(sheet: &mut Worksheet, row: u32, labels: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, label) in labels.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *label, format)?;
    }
    Ok(())
}

// ==============================================================================
// REVENUE
// ==============================================================================

pub fn revenue_workbook(report: &RevenueReport) -> Result<Vec<u8>, XlsxError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Rapport Revenus")?;

    sheet.merge_range(0, 0, 0, 5, "RAPPORT DE REVENUS - CABINET MÉDICAL", &styles.title)?;
    sheet.write_string(
        1,
        0,
        format!(
            "Période: Du {} au {}",
            report.start.format("%d/%m/%Y"),
            report.end.format("%d/%m/%Y")
        ),
    )?;

    let mut row = 3;
    sheet.write_string_with_format(row, 0, "STATISTIQUES GÉNÉRALES", &styles.section)?;
    row += 1;
    let money_lines = [
        ("Revenu Total", report.total_revenue),
        ("Remises", report.total_discounts),
        ("Revenu Net", report.net_revenue),
    ];
    for (label, amount) in money_lines {
        sheet.write_string(row, 0, label)?;
        sheet.write_number_with_format(row, 1, amount, &styles.money)?;
        row += 1;
    }
    sheet.write_string(row, 0, "Nombre de Consultations")?;
    sheet.write_number(row, 1, report.consultation_count as f64)?;
    row += 1;
    sheet.write_string(row, 0, "Moyenne par Consultation")?;
    sheet.write_number_with_format(row, 1, report.average_per_consultation, &styles.money)?;
    row += 2;

    sheet.write_string_with_format(row, 0, "MODES DE PAIEMENT", &styles.section)?;
    row += 1;
    for method in &report.payment_methods {
        sheet.write_string(row, 0, &method.label)?;
        sheet.write_number_with_format(row, 1, method.amount, &styles.money)?;
        row += 1;
    }
    row += 1;

    sheet.write_string_with_format(row, 0, "REVENUS PAR SERVICE", &styles.section)?;
    row += 1;
    header_row(sheet, row, &["Service", "Nombre", "Revenu"], &styles.section)?;
    row += 1;
    for service in &report.services {
        sheet.write_string(row, 0, &service.name)?;
        sheet.write_number(row, 1, service.count as f64)?;
        sheet.write_number_with_format(row, 2, service.revenue, &styles.money)?;
        row += 1;
    }
    row += 1;

    sheet.write_string_with_format(row, 0, "DÉTAIL DES CONSULTATIONS", &styles.section)?;
    row += 1;
    header_row(
        sheet,
        row,
        &["Date", "Patient", "Service", "Prix", "Remise", "Net"],
        &styles.header,
    )?;
    row += 1;
    for line in &report.consultations {
        let date = line
            .consultation_date
            .map(|at| at.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default();
        sheet.write_string(row, 0, date)?;
        sheet.write_string(row, 1, &line.patient)?;
        sheet.write_string(row, 2, &line.service)?;
        sheet.write_number_with_format(row, 3, line.price, &styles.money)?;
        sheet.write_number_with_format(row, 4, line.discount, &styles.money)?;
        sheet.write_number_with_format(row, 5, line.net, &styles.money)?;
        row += 1;
    }

    sheet.autofit();
    workbook.save_to_buffer()
}

// ==============================================================================
// STATISTICS
// ==============================================================================

pub fn statistics_workbook(stats: &Statistics) -> Result<Vec<u8>, XlsxError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Patients")?;
        sheet.write_string_with_format(0, 0, "RÉPARTITION PAR TRANCHE D'ÂGE", &styles.section)?;
        header_row(sheet, 1, &["Tranche d'âge", "Nombre"], &styles.header)?;
        let mut row = 2;
        for group in &stats.patients_by_age {
            sheet.write_string(row, 0, &group.label)?;
            sheet.write_number(row, 1, group.count as f64)?;
            row += 1;
        }

        row += 1;
        sheet.write_string_with_format(row, 0, "RÉPARTITION PAR SEXE", &styles.section)?;
        header_row(sheet, row + 1, &["Sexe", "Nombre"], &styles.header)?;
        row += 2;
        for sex in &stats.patients_by_sex {
            sheet.write_string(row, 0, &sex.label)?;
            sheet.write_number(row, 1, sex.count as f64)?;
            row += 1;
        }
        sheet.autofit();
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Consultations & Revenus")?;
        sheet.write_string_with_format(0, 0, "ÉVOLUTION MENSUELLE", &styles.section)?;
        header_row(sheet, 1, &["Mois", "Consultations", "Revenu"], &styles.header)?;
        for (offset, month) in stats.monthly.iter().enumerate() {
            let row = 2 + offset as u32;
            sheet.write_string(row, 0, &month.label)?;
            sheet.write_number(row, 1, month.count as f64)?;
            sheet.write_number_with_format(row, 2, month.revenue, &styles.money)?;
        }
        sheet.autofit();
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Top Services")?;
        sheet.write_string_with_format(0, 0, "TOPS SERVICES", &styles.section)?;
        header_row(sheet, 1, &["Service", "Nombre", "Revenu"], &styles.header)?;
        for (offset, service) in stats.top_services.iter().enumerate() {
            let row = 2 + offset as u32;
            sheet.write_string(row, 0, &service.name)?;
            sheet.write_number(row, 1, service.count as f64)?;
            sheet.write_number_with_format(row, 2, service.revenue, &styles.money)?;
        }
        sheet.autofit();
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Alertes Stock")?;
        sheet.write_string_with_format(0, 0, "PRODUITS EN STOCK BAS OU RUPTURE", &styles.section)?;
        header_row(sheet, 1, &["Produit", "Quantité", "Seuil Alerte"], &styles.header)?;
        for (offset, item) in stats.low_stock_items.iter().enumerate() {
            let row = 2 + offset as u32;
            if item.is_out() {
                sheet.write_string_with_format(row, 0, &item.name, &styles.alert)?;
            } else {
                sheet.write_string(row, 0, &item.name)?;
            }
            sheet.write_number(row, 1, item.quantity)?;
            sheet.write_number(row, 2, item.alarm)?;
        }
        sheet.autofit();
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Period, RevenueConsultation, NameRef};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn file_names_carry_the_dates() {
        assert_eq!(
            revenue_file_name(day(2026, 10, 1), day(2026, 10, 15)),
            "Rapport_Revenus_20261001_20261015.xlsx"
        );
        assert_eq!(statistics_file_name(day(2026, 10, 15)), "Statistiques_Cabinet_20261015.xlsx");
    }

    #[test]
    fn revenue_workbook_is_a_zip_archive() {
        let row = RevenueConsultation {
            id: 1,
            price: Some(200.0),
            discount: Some(20.0),
            payment_method: Some("Espèces".into()),
            consultation_date: day(2026, 10, 15).and_hms_opt(9, 30, 0),
            service_id: Some(1),
            service_name: Some("Consultation".into()),
            patient: Some(NameRef { last_name: Some("Alaoui".into()), first_name: None }),
            service: None,
        };
        let report = RevenueReport::build(Period::Today, day(2026, 10, 15), day(2026, 10, 15), &[row]);

        let bytes = revenue_workbook(&report).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn statistics_workbook_renders_empty_data() {
        let stats = Statistics::build(day(2026, 10, 15), &[], &[], &[]);
        let bytes = statistics_workbook(&stats).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
