//! Effect Chain Executor
//!
//! Runs an ordered list of effect plugins over a frame. Order is
//! authoritative; a failing effect is skipped for the current tick only,
//! its fault counted and the log throttled. The same executor serves
//! clip-level and player-level chains.

use log::error;

use crate::effects::transport::TransportEffect;
use crate::frame::Frame;
use crate::plugin::{Effect, EffectContext, ParamValue};

/// Log the first fault and then every Nth.
const FAULT_LOG_EVERY: u64 = 120;

struct EffectSlot {
    effect: Box<dyn Effect>,
    fault_count: u64,
}

#[derive(Default)]
pub struct EffectChain {
    slots: Vec<EffectSlot>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.slots.push(EffectSlot {
            effect,
            fault_count: 0,
        });
    }

    pub fn insert(&mut self, index: usize, effect: Box<dyn Effect>) {
        let index = index.min(self.slots.len());
        self.slots.insert(
            index,
            EffectSlot {
                effect,
                fault_count: 0,
            },
        );
    }

    pub fn remove(&mut self, index: usize) -> Result<(), String> {
        if index >= self.slots.len() {
            return Err(format!("effect index {} out of range", index));
        }
        let mut slot = self.slots.remove(index);
        slot.effect.cleanup();
        Ok(())
    }

    /// Move an effect to a new position. Order is semantically
    /// significant; this is the only way it changes.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), String> {
        if from >= self.slots.len() || to >= self.slots.len() {
            return Err(format!(
                "reorder {} -> {} out of range (len {})",
                from,
                to,
                self.slots.len()
            ));
        }
        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);
        Ok(())
    }

    /// Apply the chain in order. Never fails: faulting effects are
    /// skipped and the frame continues down the chain.
    pub fn apply(&mut self, mut frame: Frame, ctx: &EffectContext) -> Frame {
        for slot in self.slots.iter_mut() {
            match slot.effect.process(frame.clone(), ctx) {
                Ok(processed) => frame = processed,
                Err(e) => {
                    slot.fault_count += 1;
                    if slot.fault_count == 1 || slot.fault_count % FAULT_LOG_EVERY == 0 {
                        error!(
                            "[chain] effect '{}' fault #{}: {}",
                            slot.effect.meta().id,
                            slot.fault_count,
                            e
                        );
                    }
                }
            }
        }
        frame
    }

    /// Route a parameter update to the effect at `index`.
    pub fn update_param(&mut self, index: usize, name: &str, value: ParamValue) -> Result<bool, String> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| format!("effect index {} out of range", index))?;
        Ok(slot.effect.update_param(name, value))
    }

    /// Find the transport effect, if this chain hosts one.
    pub fn transport_mut(&mut self) -> Option<&mut TransportEffect> {
        self.slots
            .iter_mut()
            .find(|s| s.effect.meta().id == "transport")
            .and_then(|s| s.effect.as_any_mut().downcast_mut::<TransportEffect>())
    }

    pub fn effect_ids(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.effect.meta().id).collect()
    }

    /// Per-effect fault counts, for the status endpoint.
    pub fn fault_counts(&self) -> Vec<(&'static str, u64)> {
        self.slots
            .iter()
            .map(|s| (s.effect.meta().id, s.fault_count))
            .collect()
    }

    pub fn effect_params(&self, index: usize) -> Option<crate::plugin::ParamMap> {
        self.slots.get(index).map(|s| s.effect.params())
    }

    pub fn cleanup(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.effect.cleanup();
        }
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{
        create_effect, ParamMap, ParamSpec, Plugin, PluginKind, PluginMeta,
    };

    struct FailingEffect;

    const FAILING_META: PluginMeta = PluginMeta {
        id: "failing",
        name: "Failing",
        description: "always errors",
        author: "test",
        version: "0",
        kind: PluginKind::Effect,
    };

    impl Plugin for FailingEffect {
        fn meta(&self) -> &'static PluginMeta {
            &FAILING_META
        }
        fn param_schema(&self) -> &'static [ParamSpec] {
            &[]
        }
        fn update_param(&mut self, _: &str, _: ParamValue) -> bool {
            false
        }
        fn params(&self) -> ParamMap {
            ParamMap::new()
        }
    }

    impl Effect for FailingEffect {
        fn process(&mut self, _: Frame, _: &EffectContext) -> Result<Frame, String> {
            Err("boom".into())
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn ctx() -> EffectContext {
        EffectContext::new(0.0, 0, 30.0, 2, 2)
    }

    #[test]
    fn order_is_semantically_significant() {
        let mut chain = EffectChain::new();
        chain.push(create_effect("invert", &ParamMap::new()).unwrap());
        let mut config = ParamMap::new();
        config.insert("levels".into(), ParamValue::Int(3));
        chain.push(create_effect("posterize", &config).unwrap());

        // invert(100) = 155 → posterize(3) rounds to 128.
        let out = chain.apply(Frame::solid(2, 2, [100, 100, 100]), &ctx());
        assert_eq!(out.get(0, 0), [128, 128, 128]);

        // posterize(3) first: 100 → 128 → invert = 127.
        chain.reorder(0, 1).unwrap();
        let out = chain.apply(Frame::solid(2, 2, [100, 100, 100]), &ctx());
        assert_eq!(out.get(0, 0), [127, 127, 127]);
    }

    #[test]
    fn faulting_effect_is_skipped_not_fatal() {
        let mut chain = EffectChain::new();
        chain.push(Box::new(FailingEffect));
        chain.push(create_effect("invert", &ParamMap::new()).unwrap());

        let out = chain.apply(Frame::solid(2, 2, [0, 0, 0]), &ctx());
        // The failing effect contributed nothing; invert still ran.
        assert_eq!(out.get(0, 0), [255, 255, 255]);
        assert_eq!(chain.fault_counts()[0], ("failing", 1));
    }

    #[test]
    fn finds_hosted_transport() {
        let mut chain = EffectChain::new();
        assert!(chain.transport_mut().is_none());
        chain.push(create_effect("transport", &ParamMap::new()).unwrap());
        chain.push(create_effect("invert", &ParamMap::new()).unwrap());
        assert!(chain.transport_mut().is_some());
    }

    #[test]
    fn reorder_bounds_are_checked() {
        let mut chain = EffectChain::new();
        chain.push(create_effect("invert", &ParamMap::new()).unwrap());
        assert!(chain.reorder(0, 5).is_err());
        assert!(chain.remove(3).is_err());
        assert!(chain.remove(0).is_ok());
        assert!(chain.is_empty());
    }
}
