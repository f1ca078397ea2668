use thiserror::Error;

/// Custom error type for odesys
///
/// This error type is used to wrap all possible errors that can occur when building or integrating an [crate::OdeSys]
#[derive(Error, Debug)]
pub enum OdeSysError {
    #[error("System error: {0}")]
    SystemError(#[from] SystemError),
    #[error("Linear solver error: {0}")]
    LinearSolverError(#[from] LinearSolverError),
    #[error("Non-linear solver error: {0}")]
    NonLinearSolverError(#[from] NonLinearSolverError),
    #[error("ODE solver error: {0}")]
    OdeSolverError(#[from] OdeSolverError),
    #[error("Error: {0}")]
    Other(String),
}

/// Errors raised while building a system or validating the inputs of an integration
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Right-hand side not set")]
    MissingRhs,
    #[error("System must have at least one dependent variable")]
    NoStates,
    #[error("Band ({lower}, {upper}) does not fit a system with {ny} dependent variables")]
    InvalidBand {
        lower: usize,
        upper: usize,
        ny: usize,
    },
    #[error("Expected {expected} names, got {found}")]
    WrongNamesLength { expected: usize, found: usize },
    #[error("Root function must have at least one component")]
    NoRoots,
    #[error("Initial state has wrong length: expected {expected}, got {found}")]
    WrongInitialStateLength { expected: usize, found: usize },
    #[error("Parameter vector has wrong length: expected {expected}, got {found}")]
    WrongParameterLength { expected: usize, found: usize },
    #[error("Absolute tolerance has wrong length: expected {expected}, got {found}")]
    WrongToleranceLength { expected: usize, found: usize },
    #[error("Output grid is empty")]
    EmptyOutputGrid,
    #[error("Output grid must contain at least two points after pre-processing, got {0}")]
    OutputGridTooShort(usize),
    #[error("Output grid must be strictly increasing or strictly decreasing")]
    OutputGridNotMonotonic,
    #[error("Output grid starts and ends at the same point")]
    OutputGridZeroSpan,
    #[error("Analytic jacobian requested but the system does not provide one")]
    JacobianNotAvailable,
    #[error("Component {index} out of range for a system with {ny} dependent variables")]
    ComponentOutOfRange { index: usize, ny: usize },
    #[error("Unknown variable name: {0}")]
    UnknownName(String),
    #[error("Point x = {x} is outside the integrated range")]
    InterpolationOutOfRange { x: f64 },
    #[error("Processor returned a trajectory with {found} rows for {expected} output points")]
    ProcessorShapeMismatch { expected: usize, found: usize },
}

/// Possible errors that can occur when solving a linear problem
#[derive(Error, Debug)]
pub enum LinearSolverError {
    #[error("LU not initialized")]
    LuNotInitialized,
    #[error("LU solve failed")]
    LuSolveFailed,
    #[error("Linear solver matrix not compatible with vector")]
    LinearSolverMatrixVectorNotCompatible,
}

/// Possible errors that can occur when solving a non-linear problem
#[derive(Error, Debug)]
pub enum NonLinearSolverError {
    #[error("Newton iterations did not converge")]
    NewtonDidNotConverge,
    #[error("Jacobian not reset before calling solve")]
    JacobianNotReset,
    #[error("State has wrong length: expected {expected}, got {found}")]
    WrongStateLength { expected: usize, found: usize },
}

/// Possible errors that can occur when solving an ODE
#[derive(Debug, Error)]
pub enum OdeSolverError {
    #[error(
        "Stop time = {} is less than current state time = {}",
        stop_time,
        state_time
    )]
    StopTimeBeforeCurrentTime { stop_time: f64, state_time: f64 },
    #[error("Stop time is at the current state time")]
    StopTimeAtCurrentTime,
    #[error("Interpolation vector is not the correct length, expected {expected}, got {found}")]
    InterpolationVectorWrongSize { expected: usize, found: usize },
    #[error("Interpolation time is not within the current step")]
    InterpolationTimeOutsideCurrentStep,
    #[error("Exceeded maximum number of error test failures at time = {time}")]
    TooManyErrorTestFailures { time: f64 },
    #[error("Step size is too small at time = {time}")]
    StepSizeTooSmall { time: f64 },
    #[error("Exceeded maximum number of steps ({nsteps}) at time = {time}")]
    TooManySteps { nsteps: usize, time: f64 },
    #[error("Invalid Tableau: {0}")]
    InvalidTableau(String),
    #[error("Unknown integrator: {0}")]
    UnknownIntegrator(String),
    #[error("Error: {0}")]
    Other(String),
}

#[macro_export]
macro_rules! system_error {
    ($variant:ident) => {
        OdeSysError::from(SystemError::$variant)
    };
    ($variant:ident, $($arg:tt)*) => {
        OdeSysError::from(SystemError::$variant($($arg)*))
    };
}

#[macro_export]
macro_rules! linear_solver_error {
    ($variant:ident) => {
        OdeSysError::from(LinearSolverError::$variant)
    };
    ($variant:ident, $($arg:tt)*) => {
        OdeSysError::from(LinearSolverError::$variant($($arg)*))
    };
}

#[macro_export]
macro_rules! non_linear_solver_error {
    ($variant:ident) => {
        OdeSysError::from(NonLinearSolverError::$variant)
    };
    ($variant:ident, $($arg:tt)*) => {
        OdeSysError::from(NonLinearSolverError::$variant($($arg)*))
    };
}

#[macro_export]
macro_rules! ode_solver_error {
    ($variant:ident) => {
        OdeSysError::from(OdeSolverError::$variant)
    };
    ($variant:ident, $($arg:tt)*) => {
        OdeSysError::from(OdeSolverError::$variant($($arg)*.to_string()))
    };
}

#[macro_export]
macro_rules! other_error {
    ($msg:expr) => {
        OdeSysError::Other($msg.to_string())
    };
}
