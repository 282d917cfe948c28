//! Frame-chain traversal over a dataset provider.
//!
//! Frames within a scene are a singly linked list (`next` references).
//! [`FrameChain`] turns that list into a finite, restartable sequence:
//! every call to [`FrameChain::frames`] starts again from the scene's first
//! frame, and frame ids are assigned by traversal position.
//!
//! ```text
//! scene.first ──► frame 0 ──next──► frame 1 ──next──► ... ──► frame k ──► (none)
//! ```

use crate::error::ProviderError;
use crate::provider::DatasetProvider;
use crate::types::{FrameRecord, SampleToken};
use std::collections::HashSet;

/// The frame chain of one scene.
pub struct FrameChain<'a, P: DatasetProvider + ?Sized> {
    provider: &'a P,
    first: Option<SampleToken>,
}

impl<'a, P: DatasetProvider + ?Sized> FrameChain<'a, P> {
    /// Creates a chain starting at `first` (no frames when `None`).
    pub fn new(provider: &'a P, first: Option<SampleToken>) -> Self {
        Self { provider, first }
    }

    /// Creates the chain for a catalog scene.
    pub fn for_scene(provider: &'a P, scene_id: usize) -> Result<Self, ProviderError> {
        let scene = provider.scene(scene_id)?;
        Ok(Self::new(provider, scene.first_sample))
    }

    /// Returns a fresh cursor positioned before the first frame.
    pub fn frames(&self) -> FrameCursor<'a, P> {
        FrameCursor {
            provider: self.provider,
            next: self.first.clone(),
            frame_id: 0,
            visited: HashSet::new(),
            failed: false,
        }
    }
}

/// Cursor yielding `(frame_id, FrameRecord)` in chain order.
///
/// A read failure, or a link back to an already visited frame, is yielded
/// once, after which the cursor is exhausted.
pub struct FrameCursor<'a, P: DatasetProvider + ?Sized> {
    provider: &'a P,
    next: Option<SampleToken>,
    frame_id: usize,
    visited: HashSet<SampleToken>,
    failed: bool,
}

impl<'a, P: DatasetProvider + ?Sized> Iterator for FrameCursor<'a, P> {
    type Item = Result<(usize, FrameRecord), ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let token = self.next.take()?;
        if !self.visited.insert(token.clone()) {
            self.failed = true;
            return Some(Err(ProviderError::CyclicChain {
                token: token.to_string(),
            }));
        }

        match self.provider.frame(&token) {
            Ok(frame) => {
                let frame_id = self.frame_id;
                self.frame_id += 1;
                self.next = frame.next.clone();
                Some(Ok((frame_id, frame)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a, P: DatasetProvider + ?Sized> std::iter::FusedIterator for FrameCursor<'a, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_impl::MemoryProvider;

    fn three_frame_provider() -> MemoryProvider {
        let mut provider = MemoryProvider::new();
        let scene = provider.add_scene("scene_0");
        for _ in 0..3 {
            provider.push_frame(scene);
        }
        provider
    }

    #[test]
    fn test_chain_assigns_sequential_ids() {
        let provider = three_frame_provider();
        let chain = FrameChain::for_scene(&provider, 0).unwrap();

        let ids: Vec<usize> = chain.frames().map(|f| f.unwrap().0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_chain_is_restartable() {
        let provider = three_frame_provider();
        let chain = FrameChain::for_scene(&provider, 0).unwrap();

        let first: Vec<FrameRecord> = chain.frames().map(|f| f.unwrap().1).collect();
        let second: Vec<FrameRecord> = chain.frames().map(|f| f.unwrap().1).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_chain() {
        let provider = MemoryProvider::new();
        let chain = FrameChain::new(&provider, None);
        assert_eq!(chain.frames().count(), 0);
    }

    /// Two frames linked a -> b -> a.
    struct LoopingProvider;

    impl DatasetProvider for LoopingProvider {
        fn scene_count(&self) -> usize {
            1
        }

        fn scene(&self, _scene_id: usize) -> Result<crate::types::SceneRecord, ProviderError> {
            Ok(crate::types::SceneRecord {
                name: "loop".to_string(),
                first_sample: Some(SampleToken::new("a")),
            })
        }

        fn frame(&self, token: &SampleToken) -> Result<FrameRecord, ProviderError> {
            let next = if token.as_str() == "a" { "b" } else { "a" };
            Ok(FrameRecord {
                channels: Vec::new(),
                next: Some(SampleToken::new(next)),
            })
        }

        fn sensor_record(
            &self,
            token: &crate::types::SampleDataToken,
        ) -> Result<crate::types::SensorRecord, ProviderError> {
            Err(ProviderError::unknown("sample_data", token))
        }

        fn load_payload(&self, filename: &str) -> Result<Vec<f64>, ProviderError> {
            Err(ProviderError::MissingPayload(filename.to_string()))
        }
    }

    #[test]
    fn test_cyclic_chain_yields_error_then_stops() {
        let chain = FrameChain::for_scene(&LoopingProvider, 0).unwrap();
        let items: Vec<_> = chain.frames().take(10).collect();

        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Ok((0, _))));
        assert!(matches!(items[1], Ok((1, _))));
        assert!(matches!(
            items[2],
            Err(ProviderError::CyclicChain { ref token }) if token == "a"
        ));
    }

    #[test]
    fn test_broken_link_yields_error_then_stops() {
        let provider = MemoryProvider::new();
        let chain = FrameChain::new(&provider, Some(SampleToken::new("dangling")));
        let mut cursor = chain.frames();

        assert!(matches!(
            cursor.next(),
            Some(Err(ProviderError::UnknownToken { .. }))
        ));
        assert!(cursor.next().is_none());
    }
}
