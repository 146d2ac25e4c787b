// comm.rs - Message passing between ranks
//
// Every rank owns a mailbox (an unbounded tokio channel) and holds a sender to
// every mailbox in the world, its own included. Nothing else is shared between
// ranks apart from the barrier.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Barrier;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::CommError;
use crate::topology::Direction;

/// The coordinating rank.
pub const ROOT: usize = 0;

/// Message class. Receives match on `(source rank, tag)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    /// Halo data as seen by the receiver: `Halo(Up)` fills its up buffer.
    Halo(Direction),
    Scatter,
    Gather,
    Reduce,
    Broadcast,
    Report,
}

#[derive(Debug)]
pub struct Envelope {
    pub src: usize,
    pub tag: Tag,
    pub payload: Vec<u8>,
}

/// Handle for a send that has been started. Sends are eager, so the
/// outcome is already known; it is reported when the handle is awaited.
#[must_use = "a send request must be completed with SendRequest::wait"]
#[derive(Debug)]
pub struct SendRequest {
    outcome: Result<(), CommError>,
}

impl SendRequest {
    pub fn wait(self) -> Result<(), CommError> {
        self.outcome
    }
}

/// Handle for a posted receive. Holds only the match key; the payload is
/// pulled out of the mailbox by [`Comm::wait`].
#[must_use = "a receive request must be completed with Comm::wait"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvRequest {
    src: usize,
    tag: Tag,
}

struct Mailbox {
    rx: UnboundedReceiver<Envelope>,
    stash: VecDeque<Envelope>,
}

impl Mailbox {
    async fn take(&mut self, src: usize, tag: Tag) -> Result<Vec<u8>, CommError> {
        if let Some(pos) = self.stash.iter().position(|e| e.src == src && e.tag == tag) {
            if let Some(env) = self.stash.remove(pos) {
                return Ok(env.payload);
            }
        }
        loop {
            match self.rx.recv().await {
                Some(env) if env.src == src && env.tag == tag => return Ok(env.payload),
                Some(env) => self.stash.push_back(env),
                None => return Err(CommError::Disconnected { peer: src }),
            }
        }
    }
}

/// One rank's endpoint.
pub struct Comm {
    rank: usize,
    peers: Arc<[UnboundedSender<Envelope>]>,
    mailbox: Mailbox,
    barrier: Arc<Barrier>,
}

/// Builds `size` connected endpoints; element `r` belongs to rank `r`.
pub fn world(size: usize) -> Vec<Comm> {
    let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::unbounded_channel::<Envelope>()).unzip();
    let peers: Arc<[UnboundedSender<Envelope>]> = senders.into();
    let barrier = Arc::new(Barrier::new(size));

    receivers
        .into_iter()
        .enumerate()
        .map(|(rank, rx)| Comm {
            rank,
            peers: Arc::clone(&peers),
            mailbox: Mailbox { rx, stash: VecDeque::new() },
            barrier: Arc::clone(&barrier),
        })
        .collect()
}

impl Comm {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.peers.len()
    }

    pub fn is_root(&self) -> bool {
        self.rank == ROOT
    }

    /// Starts a send; never blocks.
    pub fn isend(&self, dst: usize, tag: Tag, payload: Vec<u8>) -> SendRequest {
        let outcome = match self.peers.get(dst) {
            None => Err(CommError::NoSuchRank { peer: dst, size: self.size() }),
            Some(tx) => tx
                .send(Envelope { src: self.rank, tag, payload })
                .map_err(|_| CommError::Disconnected { peer: dst }),
        };
        SendRequest { outcome }
    }

    /// Posts a receive; the data is claimed by [`Comm::wait`].
    pub fn irecv(&self, src: usize, tag: Tag) -> RecvRequest {
        RecvRequest { src, tag }
    }

    pub async fn wait(&mut self, request: RecvRequest) -> Result<Vec<u8>, CommError> {
        if request.src >= self.size() {
            return Err(CommError::NoSuchRank { peer: request.src, size: self.size() });
        }
        self.mailbox.take(request.src, request.tag).await
    }

    /// Completes every request, returning payloads in request order.
    pub async fn wait_all(&mut self, requests: &[RecvRequest]) -> Result<Vec<Vec<u8>>, CommError> {
        let mut payloads = Vec::with_capacity(requests.len());
        for &request in requests {
            payloads.push(self.wait(request).await?);
        }
        Ok(payloads)
    }

    pub async fn send(&self, dst: usize, tag: Tag, payload: Vec<u8>) -> Result<(), CommError> {
        self.isend(dst, tag, payload).wait()
    }

    pub async fn recv(&mut self, src: usize, tag: Tag) -> Result<Vec<u8>, CommError> {
        let request = self.irecv(src, tag);
        self.wait(request).await
    }

    pub async fn barrier(&self) {
        self.barrier.wait().await;
    }

    /// Collects one payload per rank at the root, in rank order.
    pub async fn gather_root(&mut self, tag: Tag, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError> {
        if !self.is_root() {
            self.send(ROOT, tag, payload).await?;
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(self.size());
        parts.push(payload);
        for src in 1..self.size() {
            parts.push(self.recv(src, tag).await?);
        }
        Ok(Some(parts))
    }

    /// Hands part `r` of the root's `parts` to rank `r`.
    pub async fn scatter_root(&mut self, tag: Tag, parts: Option<Vec<Vec<u8>>>) -> Result<Vec<u8>, CommError> {
        if !self.is_root() {
            return self.recv(ROOT, tag).await;
        }
        let parts = parts.ok_or_else(|| CommError::Protocol("root has nothing to scatter".into()))?;
        if parts.len() != self.size() {
            return Err(CommError::Protocol(format!(
                "scatter of {} parts over {} ranks",
                parts.len(),
                self.size()
            )));
        }
        let mut parts = parts.into_iter();
        let own = parts.next().unwrap_or_default();
        for (dst, part) in parts.enumerate() {
            self.isend(dst + 1, tag, part).wait()?;
        }
        Ok(own)
    }

    pub async fn broadcast(&mut self, tag: Tag, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError> {
        if !self.is_root() {
            return self.recv(ROOT, tag).await;
        }
        let payload = payload.ok_or_else(|| CommError::Protocol("root has nothing to broadcast".into()))?;
        for dst in 1..self.size() {
            self.isend(dst, tag, payload.clone()).wait()?;
        }
        Ok(payload)
    }

    /// Element-wise maximum across all ranks; every rank gets the same answer.
    pub async fn all_reduce_max(&mut self, values: Vec<u8>) -> Result<Vec<u8>, CommError> {
        let len = values.len();
        let reduced = match self.gather_root(Tag::Reduce, values).await? {
            None => None,
            Some(parts) => {
                let mut acc = vec![0u8; len];
                for part in parts {
                    if part.len() != len {
                        return Err(CommError::Protocol(format!(
                            "reduce of {} values met {} values",
                            len,
                            part.len()
                        )));
                    }
                    acc.iter_mut().zip(part).for_each(|(a, v)| *a = (*a).max(v));
                }
                Some(acc)
            }
        };
        self.broadcast(Tag::Broadcast, reduced).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn point_to_point_matches_on_source_and_tag() {
        let mut comms = world(2);
        let mut b = comms.pop().unwrap();
        let a = comms.pop().unwrap();

        a.isend(1, Tag::Halo(Direction::Up), vec![1]).wait().unwrap();
        a.isend(1, Tag::Halo(Direction::Down), vec![2]).wait().unwrap();

        // Out of arrival order: the up message gets stashed.
        let down = b.irecv(0, Tag::Halo(Direction::Down));
        let up = b.irecv(0, Tag::Halo(Direction::Up));
        assert_eq!(b.wait_all(&[down, up]).await.unwrap(), vec![vec![2], vec![1]]);
    }

    #[tokio::test]
    async fn same_key_is_fifo() {
        let mut comms = world(1);
        let mut me = comms.pop().unwrap();
        me.isend(0, Tag::Scatter, vec![1]).wait().unwrap();
        me.isend(0, Tag::Scatter, vec![2]).wait().unwrap();
        assert_eq!(me.recv(0, Tag::Scatter).await.unwrap(), vec![1]);
        assert_eq!(me.recv(0, Tag::Scatter).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn send_to_unknown_rank_fails() {
        let comms = world(1);
        assert_eq!(
            comms[0].isend(3, Tag::Gather, vec![]).wait(),
            Err(CommError::NoSuchRank { peer: 3, size: 1 })
        );
    }

    #[tokio::test]
    async fn all_reduce_agrees_everywhere() {
        let mut handles = Vec::new();
        for (rank, mut comm) in world(4).into_iter().enumerate() {
            handles.push(tokio::spawn(async move {
                let flags = vec![(rank == 2) as u8, 0];
                comm.all_reduce_max(flags).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec![1, 0]);
        }
    }

    #[tokio::test]
    async fn scatter_then_gather_round_trips() {
        let mut handles = Vec::new();
        for mut comm in world(3) {
            handles.push(tokio::spawn(async move {
                let parts = comm.is_root().then(|| vec![vec![10], vec![11], vec![12]]);
                let mine = comm.scatter_root(Tag::Scatter, parts).await?;
                assert_eq!(mine, vec![10 + comm.rank() as u8]);
                comm.barrier().await;
                comm.gather_root(Tag::Gather, mine).await
            }));
        }
        let results: Vec<_> = futures_join(handles).await;
        assert_eq!(results[0], Some(vec![vec![10], vec![11], vec![12]]));
        assert!(results[1..].iter().all(Option::is_none));
    }

    async fn futures_join(
        handles: Vec<tokio::task::JoinHandle<Result<Option<Vec<Vec<u8>>>, CommError>>>,
    ) -> Vec<Option<Vec<Vec<u8>>>> {
        let mut out = Vec::new();
        for handle in handles {
            out.push(handle.await.unwrap().unwrap());
        }
        out
    }
}
