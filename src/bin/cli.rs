//! Bookshelf CLI Client
//!
//! Command-line interface for interacting with a Bookshelf server.

use bookshelf::network::Client;
use bookshelf::{Book, Criterion, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

/// Bookshelf CLI
#[derive(Parser, Debug)]
#[command(name = "bookshelf-cli")]
#[command(about = "CLI for the Bookshelf catalog")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "localhost:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a book to the catalog
    Create {
        #[arg(long)]
        author: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        isbn: String,
    },

    /// Look a book up by id or ISBN
    Get(GetArgs),

    /// Delete a book by id
    Delete {
        /// The id to delete
        id: u64,
    },

    /// Ping the server
    Ping,

    /// Create a sample book, read it back both ways, then delete it
    Demo,
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct GetArgs {
    #[arg(long)]
    id: Option<u64>,

    #[arg(long)]
    isbn: Option<String>,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(args.server.as_str())?;

    match args.command {
        Commands::Create { author, title, isbn } => {
            let book = client.create_book(&Book::draft(author, title, isbn))?;
            print_books(&[book]);
        }
        Commands::Get(get) => {
            let criterion = match (get.id, get.isbn) {
                (Some(id), _) => Criterion::Id(id),
                (None, Some(isbn)) => Criterion::Isbn(isbn),
                (None, None) => unreachable!("clap requires --id or --isbn"),
            };
            print_books(&client.get_book(criterion)?);
        }
        Commands::Delete { id } => {
            client.delete_book(id)?;
            println!("deleted {}", id);
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Demo => demo(&mut client)?,
    }

    Ok(())
}

fn demo(client: &mut Client) -> Result<()> {
    let draft = Book::draft(
        "Ken Follet",
        "The Pillars of the Earth",
        "978-2221110829",
    );

    let created = client.create_book(&draft)?;
    println!("created:");
    print_books(&[created.clone()]);

    println!("by id {}:", created.id);
    print_books(&client.get_book(Criterion::Id(created.id))?);

    println!("by isbn {}:", created.isbn13);
    print_books(&client.get_book(Criterion::Isbn(created.isbn13.clone()))?);

    client.delete_book(created.id)?;
    println!("deleted {}", created.id);
    Ok(())
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("(no books)");
    }
    for book in books {
        println!(
            "{:>6}  {}  {} / {}",
            book.id, book.isbn13, book.author, book.title
        );
    }
}
