pub mod bs_analytic;
pub mod merton_series;
