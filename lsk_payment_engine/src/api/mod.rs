mod payment_flow_api;

pub use payment_flow_api::{PaymentFlowApi, PaymentFlowError, ProcessingOutcome, SideEffect};
