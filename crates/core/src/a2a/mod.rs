//! In-process agent-to-agent discovery and invocation.

pub mod adapters;
pub mod external;
pub mod negotiator;
pub mod protocol;
pub mod registry;
pub mod types;
pub mod workflow;

pub use adapters::{SkillExecution, TransPakAgentAdapter, TransPakAgents};
pub use external::{
    ComplianceReport, CrossFrameworkOrchestrator, EnhancedStatus, EnhancedWorkflowOutcome,
    ExternalValidators, PricingValidation, COMPLIANCE_CHECKER_ID, PRICING_VALIDATOR_ID,
};
pub use negotiator::SkillNegotiator;
pub use protocol::{A2aProtocol, ExternalTransport, MessageOutcome, OutgoingMessage, TransportError};
pub use registry::{AgentRegistry, CapabilityQuery, RegistryStatus};
pub use types::{
    A2aMessage, AgentCapability, AgentCard, AgentFramework, CommunicationMode, SkillCategory,
    HOSTING_KEY, IN_PROCESS_HOSTING,
};
pub use workflow::{CrossFrameworkWorkflow, WorkflowOutcome};
