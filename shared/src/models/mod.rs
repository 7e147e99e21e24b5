//! Domain models shared across crates

pub mod contract;
pub mod cosigner;
pub mod party;

pub use contract::{
    Contract, ContractCreate, ContractKind, ContractState, SignatureState,
};
pub use cosigner::{
    Cosigner, CosignerCreate, CosignerRole, CosignerUpdate, InvitationState,
};
pub use party::PartyRef;
