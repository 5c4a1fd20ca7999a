// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::router::RouterCore;
use crate::routing::{round_robin, Routing};
use crate::{Direction, Packet, Router};

/// Dimension-order routing: columns first, then rows. Input ports are served
/// round-robin.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xy;

/// The XY output direction for `packet` at `router`.
pub(crate) fn xy_direction(router: &RouterCore, packet: &Packet) -> Direction {
    Direction::toward(router.coordinate(), packet.destination())
}

impl Routing for Xy {
    fn schedule(&mut self, router: &RouterCore) -> Direction {
        round_robin(router)
    }

    fn arbitrate(&self, router: &RouterCore, _mesh: &[Router], packet: &Packet) -> Direction {
        xy_direction(router, packet)
    }
}
