//! Bookkeeping of packets defined on the controller

use std::collections::BTreeMap;

use super::{plan_dpids, Dpid, PacketError, Parameter};
use crate::config::{DpidConfig, RequestDefaults};

/// Packets already defined on the controller, keyed by id
#[derive(Debug, Clone)]
pub struct DpidRegistry {
    start: u8,
    max_parameters: usize,
    defined: BTreeMap<u8, Dpid>,
}

impl Default for DpidRegistry {
    fn default() -> Self {
        Self::new(&DpidConfig::default())
    }
}

impl DpidRegistry {
    pub fn new(config: &DpidConfig) -> Self {
        Self {
            start: config.start,
            max_parameters: config.max_parameters,
            defined: BTreeMap::new(),
        }
    }

    /// First free id: one past the highest defined id, or the configured start
    pub fn next_id(&self) -> Result<u8, PacketError> {
        match self.defined.keys().next_back() {
            Some(&last) => last.checked_add(1).ok_or(PacketError::IdsExhausted(last)),
            None => Ok(self.start),
        }
    }

    /// Plan packets for `parameters` starting at the next free id
    pub fn plan(
        &self,
        parameters: &[Parameter],
        defaults: &RequestDefaults,
    ) -> Result<Vec<Dpid>, PacketError> {
        plan_dpids(parameters, self.next_id()?, self.max_parameters, defaults)
    }

    pub fn insert(&mut self, dpid: Dpid) -> Option<Dpid> {
        self.defined.insert(dpid.id(), dpid)
    }

    pub fn get(&self, id: u8) -> Option<&Dpid> {
        self.defined.get(&id)
    }

    /// Packet that already carries `parameter`, if any
    pub fn find(&self, parameter: &Parameter) -> Option<&Dpid> {
        self.defined.values().find(|d| d.contains(parameter))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dpid> {
        self.defined.values()
    }

    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }

    pub fn clear(&mut self) {
        self.defined.clear();
    }
}
