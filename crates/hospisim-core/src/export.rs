//! CSV writers for the generated tables.
//!
//! Column names are stable; rows are written in the order given, which is
//! ascending date order for every generator.

use std::io::Write;

use serde::Serialize;

use crate::error::ExportError;
use crate::types::{DailyRecord, PatientRecord};

/// Writes the wide establishment table. Per-category columns follow the
/// layout of the first record; an empty slice writes nothing.
pub fn write_establishment<W: Write>(writer: W, records: &[DailyRecord]) -> Result<(), ExportError> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(establishment_header(first))?;
    for record in records {
        csv.write_record(establishment_row(record))?;
    }
    csv.flush()?;
    Ok(())
}

fn establishment_header(record: &DailyRecord) -> Vec<String> {
    let mut header: Vec<String> = ["date", "season", "event", "event_category", "admissions"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for bed in &record.beds {
        for suffix in ["capacity", "occupied", "free", "occupancy_rate"] {
            header.push(format!("beds_{}_{}", bed.category, suffix));
        }
    }
    for staff in &record.staff {
        for suffix in ["authorized", "present", "utilization"] {
            header.push(format!("staff_{}_{}", staff.category, suffix));
        }
    }
    for equipment in &record.equipment {
        header.push(format!("equipment_{}", equipment.equipment));
    }
    for modality in &record.exams.modalities {
        header.push(format!("exams_{}", modality.modality));
    }
    for column in [
        "exams_other",
        "exams_total",
        "severe_cases",
        "deaths",
        "blood_stock",
        "blood_stock_critical",
    ] {
        header.push(column.to_string());
    }
    header
}

fn establishment_row(record: &DailyRecord) -> Vec<String> {
    let mut row = vec![
        record.date.to_string(),
        record.season.to_string(),
        record.event.clone(),
        record.event_category.to_string(),
        record.admissions.to_string(),
    ];
    for bed in &record.beds {
        row.push(bed.capacity.to_string());
        row.push(bed.occupied.to_string());
        row.push(bed.free.to_string());
        row.push(format!("{:.4}", bed.occupancy_rate));
    }
    for staff in &record.staff {
        row.push(staff.authorized.to_string());
        row.push(staff.present.to_string());
        row.push(format!("{:.4}", staff.utilization));
    }
    for equipment in &record.equipment {
        row.push(equipment.count.to_string());
    }
    for modality in &record.exams.modalities {
        row.push(modality.count.to_string());
    }
    row.push(record.exams.other.to_string());
    row.push(record.exams.total.to_string());
    row.push(record.severe_cases.to_string());
    row.push(record.deaths.to_string());
    row.push(format!("{:.1}", record.blood_stock));
    row.push(record.blood_stock_critical.to_string());
    row
}

/// Flat view of a [`PatientRecord`] with split date/time columns.
#[derive(Serialize)]
struct PatientRow<'a> {
    id: &'a str,
    admission_date: String,
    admission_time: String,
    discharge_date: String,
    discharge_time: String,
    sex: &'static str,
    age: u8,
    service: &'a str,
    admission_type: &'static str,
    reason: &'a str,
    severity: u8,
    stay_days: u32,
    cost: f64,
    arrival_mode: &'static str,
    took_bed: bool,
    bed_category: &'a str,
    bed_days: u32,
    season: &'static str,
    event: &'a str,
    had_exam: bool,
    exam_count: u32,
    exam_types: String,
}

impl<'a> From<&'a PatientRecord> for PatientRow<'a> {
    fn from(p: &'a PatientRecord) -> Self {
        Self {
            id: &p.id,
            admission_date: p.admitted_at.format("%Y-%m-%d").to_string(),
            admission_time: p.admitted_at.format("%H:%M").to_string(),
            discharge_date: p.discharged_at.format("%Y-%m-%d").to_string(),
            discharge_time: p.discharged_at.format("%H:%M").to_string(),
            sex: p.sex.as_str(),
            age: p.age,
            service: &p.service,
            admission_type: p.admission_type.as_str(),
            reason: &p.reason,
            severity: p.severity,
            stay_days: p.stay_days,
            cost: p.cost,
            arrival_mode: p.arrival_mode.as_str(),
            took_bed: p.took_bed(),
            bed_category: p.bed_category.as_deref().unwrap_or(""),
            bed_days: if p.took_bed() { p.stay_days } else { 0 },
            season: p.season.as_str(),
            event: &p.event,
            had_exam: p.exam_count > 0,
            exam_count: p.exam_count,
            exam_types: p.exam_types.join(","),
        }
    }
}

/// Writes the patient admission log.
pub fn write_patients<W: Write>(writer: W, patients: &[PatientRecord]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for patient in patients {
        csv.serialize(PatientRow::from(patient))?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes any flat serializable rows, header taken from the field names.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::Season;
    use crate::events::EventCategory;
    use crate::types::*;
    use chrono::NaiveDate;

    fn daily() -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            season: Season::Spring,
            event: "normal".to_string(),
            event_category: EventCategory::Normal,
            admissions: 401,
            beds: vec![BedOccupancy {
                category: "medicine".to_string(),
                capacity: 749,
                occupied: 510,
                free: 239,
                occupancy_rate: 0.6812,
            }],
            staff: vec![StaffPresence {
                category: "nursing".to_string(),
                authorized: 4786,
                present: 4400,
                utilization: 0.91,
            }],
            equipment: vec![EquipmentCount {
                equipment: "mri".to_string(),
                count: 7,
            }],
            exams: ExamCounts {
                modalities: vec![ModalityCount {
                    modality: "ct".to_string(),
                    count: 170,
                }],
                other: 500,
                total: 670,
            },
            severe_cases: 20,
            deaths: 0,
            blood_stock: 498.27,
            blood_stock_critical: false,
        }
    }

    #[test]
    fn test_establishment_layout() {
        let mut buf = Vec::new();
        write_establishment(&mut buf, &[daily()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("date,season,event,event_category,admissions,beds_medicine_capacity"));
        assert!(header.contains("staff_nursing_present"));
        assert!(header.contains("equipment_mri"));
        assert!(header.ends_with("exams_ct,exams_other,exams_total,severe_cases,deaths,blood_stock,blood_stock_critical"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("2024-03-04,spring,normal,normal,401,749,510,239,0.6812"));
        assert!(row.ends_with("170,500,670,20,0,498.3,false"), "{}", row);
    }

    #[test]
    fn test_empty_establishment_writes_nothing() {
        let mut buf = Vec::new();
        write_establishment(&mut buf, &[]).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_patient_row_joins_exam_types() {
        let admitted = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        let patient = PatientRecord {
            id: "P100001".to_string(),
            admitted_at: admitted,
            discharged_at: admitted + chrono::Duration::days(2),
            age: 71,
            sex: Sex::F,
            service: "cardiology".to_string(),
            admission_type: AdmissionType::Emergency,
            severity: 3,
            stay_days: 2,
            cost: 4800.5,
            arrival_mode: ArrivalMode::Ambulance,
            bed_category: Some("medicine".to_string()),
            reason: "Chest pain".to_string(),
            season: Season::Spring,
            event: "normal".to_string(),
            exam_count: 2,
            exam_types: vec!["ecg".to_string(), "lab".to_string()],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admissions.csv");
        write_patients(std::fs::File::create(&path).unwrap(), &[patient]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        let row = reader.records().next().unwrap().unwrap();
        let field = |name: &str| {
            let idx = headers.iter().position(|h| h == name).unwrap();
            row.get(idx).unwrap().to_string()
        };
        assert_eq!(field("id"), "P100001");
        assert_eq!(field("admission_time"), "09:05");
        assert_eq!(field("discharge_date"), "2024-03-06");
        assert_eq!(field("exam_types"), "ecg,lab");
        assert_eq!(field("bed_days"), "2");
        assert_eq!(field("arrival_mode"), "ambulance");
    }
}
