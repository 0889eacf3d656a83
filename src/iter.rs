//! Extraction iterators over a frame stream.
//!
//! [`Extractor`] drives a recognizer across a lazy sequence of
//! frames. Exactly one frame of lookahead is buffered (the
//! recognizers pair each address phase with the following frame), so
//! memory use is bounded no matter how long the stream runs. Output
//! order equals input-frame order.

use std::iter::Peekable;

use log::{debug, trace};

use crate::decoder::TransactionDecoder;
use crate::regmap::RegisterMap;
use crate::{DecodedTransaction, Error, Protocol, RawTransaction, SampleFrame};

/// Drives a protocol recognizer over a frame stream.
pub struct Extractor<I>
where
    I: Iterator<Item = SampleFrame>,
{
    frames: Peekable<I>,
    protocol: Protocol,
    checked: bool,
    poisoned: bool,
}

impl<I> Extractor<I>
where
    I: Iterator<Item = SampleFrame>,
{
    /// Creates an extractor over `frames` using `protocol`.
    ///
    /// The signal contract is verified lazily against the first
    /// frame: if a required signal is missing from the stream, the
    /// first iterator step yields the configuration error and the
    /// stream ends.
    pub fn new(frames: I, protocol: Protocol) -> Extractor<I> {
        Extractor {
            frames: frames.peekable(),
            protocol,
            checked: false,
            poisoned: false,
        }
    }

    /// The recognizer in use.
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Returns an iterator over [`RawTransaction`]s.
    pub fn transactions(&mut self) -> Transactions<I> {
        Transactions::new(self)
    }

    /// Returns an iterator over [`DecodedTransaction`]s, running
    /// every extracted transaction through `decoder`.
    pub fn decoded<'d, M>(&mut self, decoder: &'d TransactionDecoder<M>) -> Decoded<'_, 'd, I, M>
    where
        M: RegisterMap,
    {
        Decoded {
            extractor: self,
            decoder,
        }
    }

    /// Returns the next transaction in the stream, skipping frames
    /// that fail the validity gate.
    fn next_transaction(&mut self) -> Option<Result<RawTransaction, Error>> {
        if self.poisoned {
            return None;
        }
        if !self.checked {
            self.checked = true;
            if let Some(first) = self.frames.peek() {
                if let Err(e) = self.protocol.check_signals(first) {
                    self.poisoned = true;
                    return Some(Err(e));
                }
            }
        }

        while let Some(frame) = self.frames.next() {
            if !self.protocol.is_valid_transaction(&frame) {
                trace!(
                    "frame at t={} fails the {} validity gate",
                    frame.timestamp,
                    self.protocol.protocol_name(),
                );
                continue;
            }
            if let Some(transaction) = self.protocol.extract_transaction(&frame, self.frames.peek())
            {
                debug!(
                    "{:?} {} at t={}",
                    transaction.operation, transaction.address, transaction.time,
                );
                return Some(Ok(transaction));
            }
        }
        None
    }
}

/// Iterator that yields [`RawTransaction`]s.
pub struct Transactions<'a, I>
where
    I: Iterator<Item = SampleFrame>,
{
    extractor: &'a mut Extractor<I>,
}

impl<'a, I> Transactions<'a, I>
where
    I: Iterator<Item = SampleFrame>,
{
    pub(super) fn new(extractor: &'a mut Extractor<I>) -> Self {
        Self { extractor }
    }
}

impl<'a, I> Iterator for Transactions<'a, I>
where
    I: Iterator<Item = SampleFrame>,
{
    type Item = Result<RawTransaction, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.extractor.next_transaction()
    }
}

/// Iterator that yields [`DecodedTransaction`]s.
pub struct Decoded<'a, 'd, I, M>
where
    I: Iterator<Item = SampleFrame>,
    M: RegisterMap,
{
    extractor: &'a mut Extractor<I>,
    decoder: &'d TransactionDecoder<M>,
}

impl<'a, 'd, I, M> Iterator for Decoded<'a, 'd, I, M>
where
    I: Iterator<Item = SampleFrame>,
    M: RegisterMap,
{
    type Item = Result<DecodedTransaction, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.extractor
            .next_transaction()
            .map(|transaction| transaction.map(|t| self.decoder.decode(t)))
    }
}
