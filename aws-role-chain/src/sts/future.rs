/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Future types returned by [`AssumeRoleClient`](super::AssumeRoleClient).

use aws_smithy_async::future::now_or_later::NowOrLater;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Future new-type that both `AssumeRoleClient` operations must return.
#[derive(Debug)]
pub struct AssumeRole<'a>(NowOrLater<super::Result, BoxFuture<'a, super::Result>>);

impl<'a> AssumeRole<'a> {
    /// Creates an `AssumeRole` struct from a future.
    pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
        AssumeRole(NowOrLater::new(Box::pin(future)))
    }

    /// Creates an `AssumeRole` struct from a resolved result.
    pub fn ready(result: super::Result) -> Self {
        AssumeRole(NowOrLater::ready(result))
    }
}

impl Future for AssumeRole<'_> {
    type Output = super::Result;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}
