//! Blocking catalog client

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::catalog::{Book, Criterion};
use crate::error::{Result, ShelfError};
use crate::protocol::{read_response, write_command, Command, Status};

/// A connection to a catalog server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs + std::fmt::Debug>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(&addr)
            .map_err(|e| ShelfError::Network(format!("could not connect to {:?}: {}", addr, e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Store a new book, returning it with its assigned id
    pub fn create_book(&mut self, draft: &Book) -> Result<Book> {
        self.call(&Command::CreateBook { book: draft.clone() })?
            .into_iter()
            .next()
            .ok_or_else(|| ShelfError::Protocol("CREATE_BOOK reply carried no book".to_string()))
    }

    /// Look up by criterion; the list holds zero or one book
    pub fn get_book(&mut self, criterion: Criterion) -> Result<Vec<Book>> {
        self.call(&Command::GetBook { criterion })
    }

    pub fn get_by_id(&mut self, id: u64) -> Result<Option<Book>> {
        Ok(self.get_book(Criterion::Id(id))?.into_iter().next())
    }

    pub fn get_by_isbn(&mut self, isbn: &str) -> Result<Option<Book>> {
        Ok(self
            .get_book(Criterion::Isbn(isbn.to_string()))?
            .into_iter()
            .next())
    }

    /// Delete a book; deleting an unknown id succeeds
    pub fn delete_book(&mut self, id: u64) -> Result<()> {
        self.call(&Command::DeleteBook { id })?;
        Ok(())
    }

    pub fn ping(&mut self) -> Result<()> {
        self.call(&Command::Ping)?;
        Ok(())
    }

    /// Send one command and wait for its response
    fn call(&mut self, command: &Command) -> Result<Vec<Book>> {
        write_command(&mut self.writer, command)?;
        let response = read_response(&mut self.reader)?;

        match response.status {
            Status::Ok => Ok(response.books),
            Status::Error => Err(ShelfError::Network(format!(
                "server error: {}",
                response.message.unwrap_or_default()
            ))),
        }
    }
}
