// src/output.rs
//! CSV export of simulated terminal prices, sample paths and pricing summaries

use crate::error::SdeResult;
use crate::mc::mc_engine::PricingResult;
use crate::mc::payoffs::PayoffEvaluator;
use ndarray::Array2;
use std::io::Write;

/// Write one `path_id,s_t,payoff,discounted_payoff` row per terminal price.
///
/// Rows written before a failing path are flushed, then the path's error is
/// returned. On success returns the number of rows written.
pub fn write_terminal_prices<W, I>(
    writer: W,
    prices: I,
    evaluator: &PayoffEvaluator,
) -> SdeResult<usize>
where
    W: Write,
    I: IntoIterator<Item = SdeResult<f64>>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["path_id", "s_t", "payoff", "discounted_payoff"])?;

    let mut rows = 0;
    for (path_id, s_t) in prices.into_iter().enumerate() {
        let s_t = match s_t {
            Ok(s_t) => s_t,
            Err(e) => {
                wtr.flush()?;
                return Err(e);
            }
        };
        let payoff = evaluator.payoff().calculate(s_t);
        wtr.write_record(&[
            path_id.to_string(),
            s_t.to_string(),
            payoff.to_string(),
            (payoff * evaluator.discount()).to_string(),
        ])?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

/// Write `paths` (one path per row, as built by `collect_paths`) with a
/// `path_id,t_0,t_1,...` header.
pub fn write_paths<W: Write>(writer: W, paths: &Array2<f64>, dt: f64) -> SdeResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(paths.ncols() + 1);
    header.push("path_id".to_string());
    header.extend((0..paths.ncols()).map(|j| format!("{}", j as f64 * dt)));
    wtr.write_record(&header)?;

    for (i, row) in paths.rows().into_iter().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(i.to_string());
        record.extend(row.iter().map(|s| s.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one row per pricing result.
pub fn write_summary<W: Write>(writer: W, results: &[PricingResult]) -> SdeResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "method",
        "price",
        "std_error",
        "paths",
        "elapsed_ms",
        "computed_at",
    ])?;
    for r in results {
        wtr.write_record(&[
            r.method.to_string(),
            r.price.to_string(),
            r.std_error.to_string(),
            r.paths.to_string(),
            format!("{:.3}", r.elapsed.as_secs_f64() * 1000.0),
            r.computed_at.to_rfc3339(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
