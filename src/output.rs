//! CSV output writers
//!
//! Latency output is `scenario,percentile,time` with a mean/stddev/samples
//! preamble per scenario followed by the integer percentiles 1..=99 and the
//! 99.9/99.99/99.999/100 tail. Energy output is one row per one-second
//! sample. Both writers emit their header exactly once per stream.

use std::io::Write;

use hdrhistogram::Histogram;

use crate::error::Result;
use crate::scenario::Scenario;

/// Tail percentiles reported after the integer grid.
pub const TAIL_PERCENTILES: [f64; 4] = [99.9, 99.99, 99.999, 100.0];

/// Writer for the latency CSV stream.
pub struct LatencyWriter<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> LatencyWriter<W> {
    pub fn new(out: W) -> LatencyWriter<W> {
        LatencyWriter {
            out,
            header_written: false,
        }
    }

    /// Emit all rows for one scenario's histogram.
    pub fn write_scenario(&mut self, scenario: Scenario, hist: &Histogram<u64>) -> Result<()> {
        self.write_header()?;
        let label = scenario.label();
        writeln!(self.out, "{},mean,{:.2}", label, hist.mean())?;
        writeln!(self.out, "{},stddev,{:.2}", label, hist.stdev())?;
        writeln!(self.out, "{},samples,{}", label, hist.len())?;
        for percentile in 1..=99u32 {
            writeln!(
                self.out,
                "{},{},{}",
                label,
                percentile,
                hist.value_at_percentile(percentile as f64)
            )?;
        }
        for percentile in TAIL_PERCENTILES {
            writeln!(
                self.out,
                "{},{},{}",
                label,
                percentile,
                hist.value_at_percentile(percentile)
            )?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Recover the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Emit the header if it has not been written yet. Scenario rows call
    /// this implicitly; the driver calls it up front so a file whose
    /// scenarios were all skipped still carries the header.
    pub fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            writeln!(self.out, "scenario,percentile,time")?;
            self.header_written = true;
        }
        Ok(())
    }
}

/// Writer for the energy CSV stream.
pub struct EnergyWriter<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> EnergyWriter<W> {
    pub fn new(out: W) -> EnergyWriter<W> {
        EnergyWriter {
            out,
            header_written: false,
        }
    }

    /// Emit one sample row. Energy columns are rounded to whole nanojoules.
    pub fn write_sample(
        &mut self,
        benchmark: &str,
        scenario: Scenario,
        operations: u64,
        duration_per_op_ns: f64,
        pkg_energy_per_op_nj: f64,
        dram_energy_per_op_nj: f64,
    ) -> Result<()> {
        self.write_header()?;
        writeln!(
            self.out,
            "{},{},{},{:.2},{:.0},{:.0}",
            benchmark,
            scenario.label(),
            operations,
            duration_per_op_ns,
            pkg_energy_per_op_nj,
            dram_energy_per_op_nj,
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Recover the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Emit the header if it has not been written yet.
    pub fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            writeln!(
                self.out,
                "Benchmark,Scenario,Operations,DurationPerOperation(ns),\
                 PackageEnergyPerOperation(nJ),DRAMEnergyPerOperation(nJ)"
            )?;
            self.header_written = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_rows(csv: &str, label: &str) -> Vec<String> {
        csv.lines()
            .filter(|line| line.starts_with(label))
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_latency_rows_per_scenario() {
        let mut hist = Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3).unwrap();
        for v in 1..=1000u64 {
            hist.record(v).unwrap();
        }
        let mut writer = LatencyWriter::new(Vec::new());
        writer.write_scenario(Scenario::NoInterference, &hist).unwrap();
        writer.write_scenario(Scenario::LocalCore, &hist).unwrap();

        let csv = String::from_utf8(writer.out).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("scenario,percentile,time"));
        // Header appears once; each scenario contributes 3 + 99 + 4 rows.
        assert_eq!(csv.matches("scenario,percentile,time").count(), 1);
        assert_eq!(scenario_rows(&csv, "No interference,").len(), 106);
        assert_eq!(scenario_rows(&csv, "SMT interference,").len(), 106);
    }

    #[test]
    fn test_latency_preamble_and_tail_keys() {
        let mut hist = Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3).unwrap();
        hist.record(42).unwrap();
        let mut writer = LatencyWriter::new(Vec::new());
        writer.write_scenario(Scenario::RemotePackage, &hist).unwrap();

        let csv = String::from_utf8(writer.out).unwrap();
        assert!(csv.contains("NUMA interference,mean,"));
        assert!(csv.contains("NUMA interference,stddev,"));
        assert!(csv.contains("NUMA interference,samples,1"));
        assert!(csv.contains("NUMA interference,99.9,"));
        assert!(csv.contains("NUMA interference,99.99,"));
        assert!(csv.contains("NUMA interference,99.999,"));
        assert!(csv.contains("NUMA interference,100,"));
    }

    #[test]
    fn test_latency_percentiles_are_monotonic() {
        let mut hist = Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3).unwrap();
        for v in [5u64, 17, 120, 3000, 4500, 90_000, 1_000_000] {
            for _ in 0..100 {
                hist.record(v).unwrap();
            }
        }
        let mut writer = LatencyWriter::new(Vec::new());
        writer.write_scenario(Scenario::RemoteCore, &hist).unwrap();

        let csv = String::from_utf8(writer.out).unwrap();
        let values: Vec<u64> = csv
            .lines()
            .skip(1)
            .filter(|line| {
                let key = line.split(',').nth(1).unwrap();
                key.parse::<f64>().is_ok()
            })
            .map(|line| line.split(',').nth(2).unwrap().parse().unwrap())
            .collect();
        assert_eq!(values.len(), 103);
        for pair in values.windows(2) {
            assert!(pair[0] <= pair[1], "percentile values must not decrease");
        }
    }

    #[test]
    fn test_energy_row_format() {
        let mut writer = EnergyWriter::new(Vec::new());
        writer
            .write_sample("getuid", Scenario::NoInterference, 1_000_000, 998.75, 15.2587890625, 3.4)
            .unwrap();
        let csv = String::from_utf8(writer.out).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some(
                "Benchmark,Scenario,Operations,DurationPerOperation(ns),\
                 PackageEnergyPerOperation(nJ),DRAMEnergyPerOperation(nJ)"
            )
        );
        assert_eq!(lines.next(), Some("getuid,No interference,1000000,998.75,15,3"));
    }
}
