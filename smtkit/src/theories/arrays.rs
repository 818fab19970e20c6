// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Functional arrays (select/store/constant).

use crate::formula::{Array, Backend, Kind, Typed};
use crate::sorts::Sort;

/// Manager for the theory of arrays.
pub struct Arrays<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> Arrays<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Arrays { backend }
    }

    /// Read `array` at `index`.
    pub fn select<I: Kind, E: Kind>(
        &self,
        array: &Array<B, I, E>,
        index: &Typed<B, I>,
    ) -> Typed<B, E> {
        Typed::wrap(self.backend.select(array.term(), index.term()))
    }

    /// A copy of `array` with `index` mapped to `value`.
    pub fn store<I: Kind, E: Kind>(
        &self,
        array: &Array<B, I, E>,
        index: &Typed<B, I>,
        value: &Typed<B, E>,
    ) -> Array<B, I, E> {
        Typed::wrap(self.backend.store(array.term(), index.term(), value.term()))
    }

    /// The array mapping every index to `value`. The index and element
    /// sorts are needed because the backend rendering is sort-qualified.
    pub fn constant<I: Kind, E: Kind>(
        &self,
        index: &Sort,
        element: &Sort,
        value: &Typed<B, E>,
    ) -> Array<B, I, E> {
        Typed::wrap(self.backend.array_const(index, element, value.term()))
    }
}
