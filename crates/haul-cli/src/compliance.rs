//! # Compliance Subcommand
//!
//! Evaluates every credential in a fleet file and prints the expiration
//! report, most severe first.
//!
//! ```json
//! {
//!   "as_of": "2026-05-01",
//!   "drivers": [ ... ],
//!   "trucks": [ ... ],
//!   "trailers": [ ... ],
//!   "partnership_documents": [ ... ]
//! }
//! ```
//!
//! `as_of` is optional. `--as-of` on the command line wins over the file,
//! and today's UTC date is used when neither is given.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Deserialize;

use haul_compliance::{
    evaluate_driver, evaluate_partnership_document, evaluate_trailer, evaluate_truck,
    ComplianceReport, PartnershipDocument,
};
use haul_core::Timestamp;
use haul_fleet::{Driver, Trailer, Truck};

use crate::output::{read_json, to_pretty};

/// Arguments for `haul compliance`.
#[derive(Args, Debug)]
pub struct ComplianceArgs {
    /// Path to the JSON fleet file.
    #[arg(long, short)]
    pub file: PathBuf,

    /// Evaluation date, YYYY-MM-DD.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Exit with code 2 when any credential has expired.
    #[arg(long)]
    pub fail_on_expired: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FleetFile {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub trucks: Vec<Truck>,
    #[serde(default)]
    pub trailers: Vec<Trailer>,
    #[serde(default)]
    pub partnership_documents: Vec<PartnershipDocument>,
}

/// Report over everything in `fleet` as of `today`.
pub fn fleet_report(fleet: &FleetFile, today: NaiveDate) -> ComplianceReport {
    let mut items = Vec::new();
    for driver in &fleet.drivers {
        items.extend(evaluate_driver(driver, today));
    }
    for truck in &fleet.trucks {
        items.extend(evaluate_truck(truck, today));
    }
    for trailer in &fleet.trailers {
        items.extend(evaluate_trailer(trailer, today));
    }
    items.extend(
        fleet
            .partnership_documents
            .iter()
            .filter_map(|doc| evaluate_partnership_document(doc, today)),
    );
    ComplianceReport::new(today, items)
}

/// Execute `haul compliance`.
pub fn run_compliance(args: &ComplianceArgs) -> Result<u8> {
    let fleet: FleetFile = read_json(&args.file)?;
    let today = args
        .as_of
        .or(fleet.as_of)
        .unwrap_or_else(|| Timestamp::now().date());

    let report = fleet_report(&fleet, today);
    tracing::info!(
        %today,
        expired = report.expired,
        critical = report.critical,
        urgent = report.urgent,
        warning = report.warning,
        "fleet compliance evaluated"
    );

    if args.json {
        println!("{}", to_pretty(&report)?);
    } else {
        println!("{}", render(&report));
    }

    if args.fail_on_expired && report.expired > 0 {
        return Ok(2);
    }
    Ok(0)
}

fn render(report: &ComplianceReport) -> String {
    let mut lines = vec![format!(
        "as of {}: {} expired, {} critical, {} urgent, {} warning",
        report.generated_on, report.expired, report.critical, report.urgent, report.warning
    )];
    for item in &report.items {
        let who = serde_json::to_value(&item.subject)
            .ok()
            .and_then(|v| {
                ["name", "unit_number", "company_name"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|s| s.as_str()).map(str::to_string))
            })
            .unwrap_or_default();
        lines.push(format!(
            "  {:<8} {:<24} {:?} expires {} ({} days)",
            item.severity.as_str(),
            who,
            item.kind,
            item.expires_on,
            item.days_until_expiration
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::{CompanyId, OwnerId};
    use haul_compliance::Severity;
    use haul_fleet::VehicleType;
    use std::io::Write;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fleet() -> FleetFile {
        let owner = OwnerId::new();
        let mut driver = Driver::new(owner, "Dana Reyes");
        driver.license_expiry = Some(day(2026, 4, 28));
        driver.medical_card_expiry = Some(day(2027, 1, 1));

        let mut truck = Truck::new(owner, "T-12", VehicleType::BoxTruck);
        truck.registration_expiry = Some(day(2026, 5, 6));

        let mut trailer = Trailer::new(owner, "TR-3");
        trailer.inspection_expiry = Some(day(2026, 5, 20));

        FleetFile {
            as_of: None,
            drivers: vec![driver],
            trucks: vec![truck],
            trailers: vec![trailer],
            partnership_documents: vec![PartnershipDocument {
                company_id: CompanyId::new(),
                company_name: "Blue Line Movers".into(),
                document_name: "Certificate of insurance".into(),
                expires_on: Some(day(2026, 5, 30)),
            }],
        }
    }

    #[test]
    fn report_covers_every_record_kind() {
        let report = fleet_report(&fleet(), day(2026, 5, 1));
        assert_eq!(report.items.len(), 4);
        assert_eq!(report.expired, 1);
        assert_eq!(report.critical, 1);
        assert_eq!(report.warning, 2);
        assert_eq!(report.urgent, 0);
        assert_eq!(report.items[0].severity, Severity::Expired);
        assert_eq!(report.items[3].document_name.as_deref(), Some("Certificate of insurance"));
    }

    #[test]
    fn render_names_subjects() {
        let text = render(&fleet_report(&fleet(), day(2026, 5, 1)));
        assert!(text.contains("1 expired"));
        assert!(text.contains("Dana Reyes"));
        assert!(text.contains("Blue Line Movers"));
    }

    fn write_fleet(as_of: Option<&str>) -> tempfile::NamedTempFile {
        let f = fleet();
        let mut json = serde_json::json!({
            "drivers": f.drivers,
            "trucks": f.trucks,
            "trailers": f.trailers,
            "partnership_documents": f.partnership_documents,
        });
        if let Some(as_of) = as_of {
            json["as_of"] = serde_json::Value::String(as_of.to_string());
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();
        file
    }

    #[test]
    fn file_as_of_drives_the_exit_code() {
        let file = write_fleet(Some("2026-05-01"));
        let args = ComplianceArgs {
            file: file.path().to_path_buf(),
            as_of: None,
            fail_on_expired: true,
            json: true,
        };
        assert_eq!(run_compliance(&args).unwrap(), 2);
    }

    #[test]
    fn command_line_date_overrides_file() {
        let file = write_fleet(Some("2026-05-01"));
        let args = ComplianceArgs {
            file: file.path().to_path_buf(),
            as_of: Some(day(2026, 1, 1)),
            fail_on_expired: true,
            json: false,
        };
        assert_eq!(run_compliance(&args).unwrap(), 0);
    }
}
