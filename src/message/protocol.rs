//! # Message Protocol Constants and Types
//!
//! Core definitions for the typed message layer carried inside frame
//! payloads. The first payload byte of every message is its protocol
//! code; the rest of the layout is protocol-specific.
//!
//! The host sends command and parameter messages (codes 1-6) and
//! receives data, state, and service messages (codes 7-12), mirroring
//! the microcontroller side of the link.

use std::sync::OnceLock;

use bytes::Bytes;

use crate::error::{LinkError, Result};

/// Maximum object size attachable to a parameters message, in bytes
///
/// One byte of the 254-byte payload cap goes to the protocol code and
/// three more to the parameters header.
pub const MAX_PARAMETER_OBJECT_SIZE: usize = 250;

/// Message protocol codes
///
/// Code 0 is reserved as an "undefined" initializer on the
/// microcontroller and is never valid on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    /// Module-addressed command executed recurrently
    RepeatedModuleCommand = 1,
    /// Module-addressed command executed exactly once
    OneOffModuleCommand = 2,
    /// Module-addressed command clearing the module's command queue
    DequeueModuleCommand = 3,
    /// Kernel-addressed one-off command
    KernelCommand = 4,
    /// Module-addressed parameter object update
    ModuleParameters = 5,
    /// Kernel-addressed runtime parameter update
    KernelParameters = 6,
    /// Module event state-code with an attached data object
    ModuleData = 7,
    /// Kernel event state-code with an attached data object
    KernelData = 8,
    /// Module event state-code without additional data
    ModuleState = 9,
    /// Kernel event state-code without additional data
    KernelState = 10,
    /// Delivery receipt echoing a requested return code
    ReceptionCode = 11,
    /// Controller identification broadcast
    Identification = 12,
}

impl TryFrom<u8> for Protocol {
    type Error = LinkError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::RepeatedModuleCommand),
            2 => Ok(Self::OneOffModuleCommand),
            3 => Ok(Self::DequeueModuleCommand),
            4 => Ok(Self::KernelCommand),
            5 => Ok(Self::ModuleParameters),
            6 => Ok(Self::KernelParameters),
            7 => Ok(Self::ModuleData),
            8 => Ok(Self::KernelData),
            9 => Ok(Self::ModuleState),
            10 => Ok(Self::KernelState),
            11 => Ok(Self::ReceptionCode),
            12 => Ok(Self::Identification),
            other => Err(LinkError::Message(format!(
                "invalid protocol code: {}",
                other
            ))),
        }
    }
}

/// Scalar element kinds usable in data-message objects
///
/// The declaration order defines the tie-breaking rank used when
/// assigning prototype codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScalarKind {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
}

impl ScalarKind {
    /// All scalar kinds in rank order
    pub const ALL: [ScalarKind; 11] = [
        Self::Bool,
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::F32,
        Self::U64,
        Self::I64,
        Self::F64,
    ];

    /// Size of one scalar of this kind, in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }
}

/// Shape of the data object attached to a data message
///
/// A prototype is `count` consecutive scalars (1 through 15) of a single
/// kind. Each of the 165 valid shapes maps to a unique wire code; codes
/// are assigned in ascending order of total byte size, then scalar size,
/// then kind rank, which reproduces the enumeration both sides of the
/// link share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prototype {
    pub kind: ScalarKind,
    pub count: u8,
}

/// Maximum scalar count per prototype
pub const PROTOTYPE_MAX_COUNT: u8 = 15;

/// Number of valid prototype codes
pub const PROTOTYPE_CODE_COUNT: usize = 165;

fn prototype_table() -> &'static [Prototype] {
    static TABLE: OnceLock<Vec<Prototype>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut entries = Vec::with_capacity(PROTOTYPE_CODE_COUNT);
        for count in 1..=PROTOTYPE_MAX_COUNT {
            for kind in ScalarKind::ALL {
                entries.push(Prototype { kind, count });
            }
        }
        entries.sort_by_key(|p| (p.byte_size(), p.kind.size(), p.kind));
        entries
    })
}

impl Prototype {
    /// Create a prototype, validating the scalar count
    pub fn new(kind: ScalarKind, count: u8) -> Result<Self> {
        if count == 0 || count > PROTOTYPE_MAX_COUNT {
            return Err(LinkError::Message(format!(
                "invalid prototype scalar count: {}",
                count
            )));
        }
        Ok(Self { kind, count })
    }

    /// Resolve a wire code into its prototype shape
    pub fn from_code(code: u8) -> Result<Self> {
        let table = prototype_table();
        if code == 0 || code as usize > table.len() {
            return Err(LinkError::Message(format!(
                "invalid prototype code: {}",
                code
            )));
        }
        Ok(table[code as usize - 1])
    }

    /// The wire code of this prototype shape
    pub fn code(&self) -> u8 {
        let table = prototype_table();
        // Every valid shape is in the table by construction
        table
            .iter()
            .position(|entry| entry == self)
            .map(|index| (index + 1) as u8)
            .unwrap_or(0)
    }

    /// Total size of the described object, in bytes
    pub fn byte_size(&self) -> usize {
        self.kind.size() * self.count as usize
    }
}

/// Module-addressed command executed recurrently (protocol 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatedModuleCommand {
    /// Type (family) code of the addressed module
    pub module_type: u8,
    /// Instance ID within the module family
    pub module_id: u8,
    /// Non-zero requests a delivery receipt with this code
    pub return_code: u8,
    /// Module-type-specific command code
    pub command: u8,
    /// Run the command without blocking the controller runtime
    pub noblock: bool,
    /// Delay between command repetitions, in microseconds
    pub cycle_delay_us: u32,
}

/// Module-addressed command executed exactly once (protocol 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneOffModuleCommand {
    pub module_type: u8,
    pub module_id: u8,
    pub return_code: u8,
    pub command: u8,
    pub noblock: bool,
}

/// Module-addressed command clearing the command queue (protocol 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeueModuleCommand {
    pub module_type: u8,
    pub module_id: u8,
    pub return_code: u8,
}

/// Kernel-addressed one-off command (protocol 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelCommand {
    pub return_code: u8,
    pub command: u8,
}

/// Module-addressed parameter object update (protocol 5)
///
/// The parameter object layout is module-family-specific and opaque to
/// the link; it is forwarded byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleParameters {
    pub module_type: u8,
    pub module_id: u8,
    pub return_code: u8,
    pub object: Vec<u8>,
}

/// Kernel-addressed runtime parameter update (protocol 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelParameters {
    pub return_code: u8,
    /// Block action pins from writing (dry-run mode)
    pub action_lock: bool,
    /// Block output TTL pin activity
    pub ttl_lock: bool,
}

/// Module event state-code with an attached data object (protocol 7)
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleData {
    pub module_type: u8,
    pub module_id: u8,
    /// Command the module was executing when the message was sent
    pub command: u8,
    /// Event within the command runtime that prompted the message
    pub event: u8,
    /// Shape of the attached object
    pub prototype: Prototype,
    /// Raw object bytes, exactly `prototype.byte_size()` long
    pub object: Bytes,
}

/// Kernel event state-code with an attached data object (protocol 8)
#[derive(Debug, Clone, PartialEq)]
pub struct KernelData {
    pub command: u8,
    pub event: u8,
    pub prototype: Prototype,
    pub object: Bytes,
}

/// Module event state-code without additional data (protocol 9)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleState {
    pub module_type: u8,
    pub module_id: u8,
    pub command: u8,
    pub event: u8,
}

/// Kernel event state-code without additional data (protocol 10)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelState {
    pub command: u8,
    pub event: u8,
}

/// Messages the host sends to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    RepeatedModuleCommand(RepeatedModuleCommand),
    OneOffModuleCommand(OneOffModuleCommand),
    DequeueModuleCommand(DequeueModuleCommand),
    KernelCommand(KernelCommand),
    ModuleParameters(ModuleParameters),
    KernelParameters(KernelParameters),
}

impl OutgoingMessage {
    /// The delivery-receipt code requested by this message, if any
    pub fn return_code(&self) -> u8 {
        match self {
            Self::RepeatedModuleCommand(m) => m.return_code,
            Self::OneOffModuleCommand(m) => m.return_code,
            Self::DequeueModuleCommand(m) => m.return_code,
            Self::KernelCommand(m) => m.return_code,
            Self::ModuleParameters(m) => m.return_code,
            Self::KernelParameters(m) => m.return_code,
        }
    }
}

/// Messages the host receives from the controller
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    ModuleData(ModuleData),
    KernelData(KernelData),
    ModuleState(ModuleState),
    KernelState(KernelState),
    /// Delivery receipt echoing a previously requested return code
    ReceptionCode(u8),
    /// Controller identification broadcast carrying the controller ID
    Identification(u32),
}
