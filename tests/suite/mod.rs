mod cli;
mod history;
mod pipeline;
