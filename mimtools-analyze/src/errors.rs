use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Binding cohort not loaded; load a cohort before running analysis")]
    CohortNotLoaded,
}
