pub mod core;
pub mod storage;
pub mod vector;
pub mod text;
pub mod wire;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::vector::{CompactVector, ExpandedView, VectorBuilder, Weight, WordPos};

/*
┌──────────────────────────────────── TSVECTOR ARCHITECTURE ─────────────────────────────────┐
│                                                                                             │
│   text ('a':1A 'b')          wire (u32 count, lexeme\0, u16 npos, u16 pos...)              │
│        │                               │                                                    │
│        ▼                               ▼                                                    │
│  ┌──────────────┐              ┌──────────────┐                                             │
│  │ text::Scanner│              │ wire::recv   │── entries out of order ──┐                  │
│  └──────┬───────┘              └──────┬───────┘                          │                  │
│         │ (lexeme, positions)         │ packed in place                  │                  │
│         ▼                             │                                  ▼                  │
│  ┌─────────────────────────────────┐  │                    ┌─────────────────────────┐      │
│  │ VectorBuilder                   │◄─┼────────────────────│ rebuild (sort + merge)  │      │
│  │ • stable sort by raw bytes      │  │                    └─────────────────────────┘      │
│  │ • merge duplicates, max weight  │  │                                                     │
│  │ • MAXSTRLEN / MAXSTRPOS checks  │  │                                                     │
│  └──────────────┬──────────────────┘  │                                                     │
│                 ▼                     ▼                                                     │
│  ┌─────────────────────────────────────────────────┐      ┌───────────────────────────┐    │
│  │ CompactVector (immutable, Bytes)                │◄─────│ legacy::upgrade           │    │
│  │ [ len | count|FLAG ][ WordEntry x n ][ area ]   │      │ two pass, fresh buffer    │    │
│  │ entry = len:12 | npos:16 | reserved:4           │      └───────────────────────────┘    │
│  └──────────────┬──────────────────────────────────┘                ▲                      │
│                 │                                                    │ legacy bytes         │
│                 ├──► text::to_text / Display                                                │
│                 ├──► wire::send                                                             │
│                 ▼                                                                           │
│  ┌─────────────────────────────────────────────────┐                                        │
│  │ ExpandedView<'a, S: SliceSource>                │  S = Bytes | Vec<u8> | MmapSource      │
│  │ • entry array copied eagerly                    │      | FileSource                      │
│  │ • offsets cached up to max_index                │                                        │
│  │ • lexeme_at(i) reads exactly one entry's span   │                                        │
│  └─────────────────────────────────────────────────┘                                        │
└─────────────────────────────────────────────────────────────────────────────────────────────┘
*/
