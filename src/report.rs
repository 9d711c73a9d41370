//! Result table assembly and CSV export (spec §9 supplemented features:
//! result-table rendering).

use crate::error::SimResult;
use crate::result::ResultRecord;
use polars::prelude::*;
use rust_decimal::Decimal;
use std::path::Path;

/// Wraps a `polars::frame::DataFrame` of captured result records, converting
/// each `Decimal` field to `f64` at this one boundary — internal computation
/// stays on `Decimal` throughout; only the rendered table loses precision
/// (spec §7 "Silent handling").
pub struct ResultTable {
    frame: DataFrame,
}

fn decimal_column(records: &[ResultRecord], get: impl Fn(&ResultRecord) -> Decimal) -> Vec<f64> {
    records
        .iter()
        .map(|r| get(r).to_string().parse::<f64>().unwrap_or(0.0))
        .collect()
}

impl ResultTable {
    pub fn from_records(records: &[ResultRecord]) -> SimResult<ResultTable> {
        let frame = df! {
            "scenario" => records.iter().map(|r| r.scenario.clone()).collect::<Vec<_>>(),
            "trial" => records.iter().map(|r| r.trial).collect::<Vec<_>>(),
            "year" => records.iter().map(|r| r.year).collect::<Vec<_>>(),
            "application" => records.iter().map(|r| r.application.clone()).collect::<Vec<_>>(),
            "substance" => records.iter().map(|r| r.substance.clone()).collect::<Vec<_>>(),
            "domestic" => decimal_column(records, |r| r.domestic_kg),
            "import" => decimal_column(records, |r| r.import_kg),
            "export" => decimal_column(records, |r| r.export_kg),
            "recycle" => decimal_column(records, |r| r.recycle_kg),
            "domesticConsumption" => decimal_column(records, |r| r.domestic_consumption_tco2e),
            "importConsumption" => decimal_column(records, |r| r.import_consumption_tco2e),
            "exportConsumption" => decimal_column(records, |r| r.export_consumption_tco2e),
            "recycleConsumption" => decimal_column(records, |r| r.recycle_consumption_tco2e),
            "population" => decimal_column(records, |r| r.population_units),
            "populationNew" => decimal_column(records, |r| r.population_new_units),
            "rechargeEmissions" => decimal_column(records, |r| r.recharge_emissions_tco2e),
            "eolEmissions" => decimal_column(records, |r| r.eol_emissions_tco2e),
            "initialChargeEmissions" => decimal_column(records, |r| r.initial_charge_emissions_tco2e),
            "energyConsumption" => decimal_column(records, |r| r.energy_consumption_kwh),
            "importInitialChargeValue" => decimal_column(records, |r| r.import_initial_charge_value_kg),
            "importInitialChargeConsumption" => decimal_column(records, |r| r.import_initial_charge_consumption_tco2e),
            "importPopulation" => decimal_column(records, |r| r.import_population_units),
            "exportInitialChargeValue" => decimal_column(records, |r| r.export_initial_charge_value_kg),
            "exportInitialChargeConsumption" => decimal_column(records, |r| r.export_initial_charge_consumption_tco2e),
            "bankKg" => decimal_column(records, |r| r.bank_kg),
            "bankTCO2e" => decimal_column(records, |r| r.bank_tco2e),
            "bankChangeKg" => decimal_column(records, |r| r.bank_change_kg),
            "bankChangeTCO2e" => decimal_column(records, |r| r.bank_change_tco2e),
        }?;
        Ok(ResultTable { frame })
    }

    pub fn to_csv(&mut self, path: impl AsRef<Path>) -> SimResult<()> {
        let file = std::fs::File::create(path)?;
        CsvWriter::new(file).finish(&mut self.frame)?;
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::UseKey;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn sample_records() -> Vec<ResultRecord> {
        let mut store = crate::state::store::StreamStore::new();
        let key = UseKey::new("refrigeration", "HFC-134a");
        store.ensure(&key);
        store.enable(&key, crate::state::StreamName::Domestic).unwrap();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.domestic = crate::quantity::Quantity::new(dec!(100), crate::quantity::Units::KG);
        }
        let mut prior_bank = HashMap::new();
        vec![ResultRecord::capture("BAU", 0, 2030, &key, &store, &mut prior_bank).unwrap()]
    }

    #[test]
    fn from_records_builds_a_frame_with_one_row_per_record() {
        let records = sample_records();
        let table = ResultTable::from_records(&records).unwrap();
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn to_csv_writes_a_file() {
        let records = sample_records();
        let mut table = ResultTable::from_records(&records).unwrap();
        let path = std::env::temp_dir().join("kigali_sim_report_test.csv");
        table.to_csv(&path).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
