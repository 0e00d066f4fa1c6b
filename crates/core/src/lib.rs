pub mod a2a;
pub mod agents;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod monitor;
pub mod pricing;
pub mod quote;

pub use a2a::{
    A2aMessage, A2aProtocol, AgentCapability, AgentCard, AgentFramework, AgentRegistry,
    CapabilityQuery, CommunicationMode, CrossFrameworkWorkflow, ExternalTransport,
    MessageOutcome, OutgoingMessage, RegistryStatus, SkillCategory, SkillExecution,
    SkillNegotiator, TransPakAgentAdapter, TransPakAgents, TransportError, WorkflowOutcome,
};
pub use cache::{AgentMetrics, AgentPerformance, CachedNarrative, QuoteCache};
pub use domain::history::{ActionCount, QuoteAction, QuoteHistoryEntry};
pub use domain::quote::{AgentResults, Quote, QuoteId, QuoteStatus};
pub use domain::shipment::{Fragility, Shipment, ShipmentId, ShipmentRequest, ValidatedShipment};
pub use domain::user::{User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use monitor::{ActivityMonitor, SessionSnapshot, SessionStatus};
pub use pricing::{CostBreakdown, EnhancedPricingEngine, PricedShipment, PricingEngine};
pub use quote::{ActivityKind, ActivitySink, GeneratedQuote, Progress, QuoteGenerator};
