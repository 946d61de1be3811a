// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only diagnostic dumps of a graph.
//!
//! Both dumps are usable at any build stage, including pre-finalize, and
//! never mutate state. They are debugging aids, not interchange formats.

use crate::graph::NodeGraph;
use crate::node::InputBinding;
use std::io::{self, Write};

impl NodeGraph {
    /// Write a human-readable listing of ports, instances, and bindings.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "graph: {} nodes, {} inputs, {} outputs ({:?})",
            self.node_count(),
            self.inputs().len(),
            self.outputs().len(),
            self.state()
        )?;

        for input in self.inputs() {
            match &input.value {
                Some(value) => {
                    writeln!(out, "input {}: {} = {:?}", input.name, input.type_desc, value)?;
                }
                None => writeln!(out, "input {}: {}", input.name, input.type_desc)?,
            }
        }
        for output in self.outputs() {
            match &output.link {
                Some(link) => {
                    writeln!(out, "output {}: {} <- {}", output.name, output.type_desc, link)?;
                }
                None => writeln!(
                    out,
                    "output {}: {} = {:?}",
                    output.name, output.type_desc, output.default_value
                )?,
            }
        }

        for node in self.nodes() {
            writeln!(out, "node {} ({})", node.name(), node.type_name())?;
            let Some(node_type) = self.node_type(node.name()) else {
                writeln!(out, "    <unknown type>")?;
                continue;
            };
            for socket in node_type.inputs() {
                match node.input_binding(&socket.name) {
                    Some(InputBinding::Link(link)) => {
                        writeln!(out, "    in {} <- {}", socket.name, link)?;
                    }
                    Some(InputBinding::Extern(input)) => {
                        writeln!(out, "    in {} <- input {}", socket.name, input)?;
                    }
                    Some(InputBinding::Constant(value)) => {
                        writeln!(out, "    in {} = {:?}", socket.name, value)?;
                    }
                    None => writeln!(
                        out,
                        "    in {} = {:?} (default)",
                        socket.name, socket.default_value
                    )?,
                }
            }
            for socket in node_type.outputs() {
                match node.find_output_value(&socket.name) {
                    Some(value) => writeln!(out, "    out {} = {:?}", socket.name, value)?,
                    None => writeln!(out, "    out {}", socket.name)?,
                }
            }
        }
        Ok(())
    }

    /// Write the graph as a Graphviz DOT digraph for external visualization.
    pub fn dump_graphviz<W: Write>(&self, out: &mut W, label: &str) -> io::Result<()> {
        writeln!(out, "digraph nodegraph {{")?;
        writeln!(out, "    rankdir=LR;")?;
        writeln!(out, "    label=\"{}\";", escape(label))?;

        for input in self.inputs() {
            writeln!(
                out,
                "    \"input:{0}\" [shape=ellipse, label=\"{0}\\n{1}\"];",
                escape(&input.name),
                input.type_desc
            )?;
        }
        for output in self.outputs() {
            writeln!(
                out,
                "    \"output:{0}\" [shape=ellipse, label=\"{0}\\n{1}\"];",
                escape(&output.name),
                output.type_desc
            )?;
        }
        for node in self.nodes() {
            writeln!(
                out,
                "    \"{}\" [shape=box, label=\"{}\\n({})\"];",
                escape(node.name()),
                escape(node.name()),
                escape(node.type_name())
            )?;
        }

        for node in self.nodes() {
            for (socket, binding) in node.input_bindings() {
                match binding {
                    InputBinding::Link(link) => writeln!(
                        out,
                        "    \"{}\" -> \"{}\" [label=\"{} -> {}\"];",
                        escape(&link.node),
                        escape(node.name()),
                        escape(&link.socket),
                        escape(socket)
                    )?,
                    InputBinding::Extern(input) => writeln!(
                        out,
                        "    \"input:{}\" -> \"{}\" [label=\"{}\"];",
                        escape(input),
                        escape(node.name()),
                        escape(socket)
                    )?,
                    InputBinding::Constant(_) => {}
                }
            }
        }
        for output in self.outputs() {
            if let Some(link) = &output.link {
                writeln!(
                    out,
                    "    \"{}\" -> \"output:{}\" [label=\"{}\"];",
                    escape(&link.node),
                    escape(&output.name),
                    escape(&link.socket)
                )?;
            }
        }

        writeln!(out, "}}")
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
